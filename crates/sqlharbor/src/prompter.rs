use async_trait::async_trait;
use dialoguer::{Confirm, Input, Password, Select};
use log::{debug, error, warn};
use secrecy::SecretString;
use sqlharbor_core::{AuthenticationType, ConnectionPrompter, ConnectionProfile};

const AUTH_CHOICES: [AuthenticationType; 3] = [
    AuthenticationType::SqlLogin,
    AuthenticationType::Integrated,
    AuthenticationType::AzureMfa,
];

/// Runs a blocking dialoguer prompt off the async runtime.
///
/// Any prompt error (closed stdin, Ctrl-C) counts as a dismissal.
async fn ask<T, F>(prompt: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(prompt).await {
        Ok(Ok(answer)) => Some(answer),
        Ok(Err(e)) => {
            debug!("Prompt dismissed: {}", e);
            None
        }
        Err(e) => {
            warn!("Prompt task failed: {}", e);
            None
        }
    }
}

async fn ask_text(prompt: &str, allow_empty: bool) -> Option<String> {
    let prompt = prompt.to_string();
    ask(move || {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .interact_text()
    })
    .await
    .map(|answer| answer.trim().to_string())
}

async fn ask_optional(prompt: &str) -> Option<Option<String>> {
    ask_text(prompt, true)
        .await
        .map(|answer| Some(answer).filter(|a| !a.is_empty()))
}

async fn ask_confirm(prompt: String, default: bool) -> bool {
    ask(move || Confirm::new().with_prompt(prompt).default(default).interact())
        .await
        .unwrap_or(false)
}

/// Everything the new-connection dialog collects.
#[derive(Debug, Default)]
pub struct ConnectionAnswers {
    pub server: String,
    pub authentication_type: AuthenticationType,
    pub database: Option<String>,
    pub profile_name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub save_password: bool,
    pub account_id: Option<String>,
    pub trust_server_certificate: bool,
}

impl ConnectionAnswers {
    pub fn into_profile(self) -> ConnectionProfile {
        let mut profile = ConnectionProfile::new(self.server, self.authentication_type);
        profile.database = self.database;
        profile.profile_name = self.profile_name;
        profile.trust_server_certificate = self.trust_server_certificate;

        match self.authentication_type {
            AuthenticationType::SqlLogin => {
                profile.user = self.user;
                profile.save_password = self.save_password;
                profile.password = self.password.map(SecretString::from);
            }
            AuthenticationType::AzureMfa => profile.account_id = self.account_id,
            AuthenticationType::Integrated => {}
        }

        profile
    }
}

/// `ConnectionPrompter` backed by terminal prompts.
pub struct TerminalPrompter;

impl TerminalPrompter {
    async fn collect_answers(&self) -> Option<ConnectionAnswers> {
        let server = ask_text("Server", false).await?;

        let labels: Vec<&'static str> = AUTH_CHOICES.iter().map(|a| a.display_name()).collect();
        let choice = ask(move || {
            Select::new()
                .with_prompt("Authentication")
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;
        let authentication_type = AUTH_CHOICES.get(choice).copied().unwrap_or_default();

        let mut answers = ConnectionAnswers {
            server,
            authentication_type,
            database: ask_optional("Database (empty for default)").await?,
            ..ConnectionAnswers::default()
        };

        match authentication_type {
            AuthenticationType::SqlLogin => {
                answers.user = Some(ask_text("User", false).await?);
                let password = ask(|| {
                    Password::new()
                        .with_prompt("Password")
                        .allow_empty_password(true)
                        .interact()
                })
                .await?;
                answers.password = Some(password);
                answers.save_password =
                    ask_confirm("Save password in the system keyring?".into(), true).await;
            }
            AuthenticationType::AzureMfa => {
                answers.account_id = Some(ask_text("Account id", false).await?);
            }
            AuthenticationType::Integrated => {}
        }

        answers.trust_server_certificate =
            ask_confirm("Trust the server certificate?".into(), false).await;
        answers.profile_name = ask_optional("Display name (optional)").await?;

        Some(answers)
    }
}

#[async_trait]
impl ConnectionPrompter for TerminalPrompter {
    async fn prompt_for_connection(&self) -> Option<ConnectionProfile> {
        self.collect_answers()
            .await
            .map(ConnectionAnswers::into_profile)
    }

    async fn prompt_for_password(&self, profile: &ConnectionProfile) -> Option<SecretString> {
        let prompt = format!("Password for {}", profile.display_label());
        ask(move || Password::new().with_prompt(prompt).interact())
            .await
            .map(SecretString::from)
    }

    async fn confirm_remove(&self, label: &str) -> bool {
        ask_confirm(format!("Remove connection {label}?"), false).await
    }

    async fn prompt_ssl_remediation(
        &self,
        profile: &ConnectionProfile,
        error_message: &str,
    ) -> Option<ConnectionProfile> {
        eprintln!("{error_message}");
        let trust = ask_confirm(
            format!(
                "Trust the server certificate of {} and retry?",
                profile.server
            ),
            false,
        )
        .await;

        trust.then(|| {
            let mut fixed = profile.clone();
            fixed.trust_server_certificate = true;
            fixed
        })
    }

    async fn handle_firewall_rule(
        &self,
        profile: &ConnectionProfile,
        error_number: i64,
        error_message: &str,
    ) -> bool {
        eprintln!("{error_message} (error {error_number})");
        ask_confirm(
            format!(
                "Add a firewall rule for your address on {}, then confirm to retry",
                profile.server
            ),
            false,
        )
        .await
    }

    async fn prompt_account_refresh(&self, profile: &ConnectionProfile) -> bool {
        let account = profile.account_id.as_deref().unwrap_or("the account");
        ask_confirm(
            format!("Token refresh failed. Sign in to {account} again?"),
            false,
        )
        .await
    }

    async fn show_error(&self, message: &str) {
        error!("{}", message);
        eprintln!("error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn sql_login_answers_keep_credentials() {
        let profile = ConnectionAnswers {
            server: "srv".into(),
            user: Some("sa".into()),
            password: Some("pw".into()),
            save_password: true,
            account_id: Some("ignored".into()),
            ..ConnectionAnswers::default()
        }
        .into_profile();

        assert_eq!(profile.authentication_type, AuthenticationType::SqlLogin);
        assert_eq!(profile.user.as_deref(), Some("sa"));
        assert_eq!(
            profile.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("pw".to_string())
        );
        assert!(profile.save_password);
        assert!(profile.account_id.is_none());
    }

    #[test]
    fn integrated_answers_drop_login_fields() {
        let profile = ConnectionAnswers {
            server: "srv".into(),
            authentication_type: AuthenticationType::Integrated,
            database: Some("db1".into()),
            user: Some("sa".into()),
            password: Some("pw".into()),
            ..ConnectionAnswers::default()
        }
        .into_profile();

        assert!(profile.user.is_none());
        assert!(profile.password.is_none());
        assert_eq!(profile.database.as_deref(), Some("db1"));
    }

    #[test]
    fn azure_answers_carry_the_account() {
        let profile = ConnectionAnswers {
            server: "srv.database.windows.net".into(),
            authentication_type: AuthenticationType::AzureMfa,
            account_id: Some("acct-1".into()),
            trust_server_certificate: true,
            ..ConnectionAnswers::default()
        }
        .into_profile();

        assert_eq!(profile.account_id.as_deref(), Some("acct-1"));
        assert!(profile.trust_server_certificate);
    }
}
