pub mod fake_tools;
pub mod fakes;
pub mod fixtures;
pub mod harness;

pub use fake_tools::{FakeExpandOutcome, FakeSessionOutcome, FakeToolsService, FakeToolsStats};
pub use fakes::{FakeAzureIdentity, FakePrompter, InMemoryCredentialStore, RecordingRefresher};
pub use harness::ExplorerHarness;
