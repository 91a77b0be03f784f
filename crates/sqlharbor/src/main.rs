mod cli;
mod commands;
mod host;
mod prompter;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(commands::run(cli))
}
