use crate::{AuthenticationType, ConnectionProfile, NodeId};

/// SQL Server error number for a client IP rejected by the server firewall.
pub const FIREWALL_ERROR_NUMBER: i64 = 40615;

/// SSPI/SChannel error for an untrusted certificate chain.
pub const CERTIFICATE_ERROR_NUMBER: i64 = -2146893019;

/// Bound on session creation retries after a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Whether another attempt is allowed after `retries_done` retries.
    pub fn allows(&self, retries_done: u32) -> bool {
        retries_done < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

/// Outcome of one `create_session` call.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Created { session_id: String, node_id: NodeId },
    /// Recoverable failure. Try again with this (possibly corrected) profile.
    Retry(ConnectionProfile),
    /// The user dismissed a prompt. Nothing is reported.
    Cancelled,
    /// Azure account missing from the identity cache.
    SignInRequired { node_id: NodeId },
    Failed { message: String },
}

impl SessionOutcome {
    pub fn should_retry_on_failure(&self) -> bool {
        matches!(self, SessionOutcome::Retry(_))
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionOutcome::Created { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}

/// How a failed session creation is recovered, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Certificate,
    Firewall,
    AccountRefresh,
    Terminal,
}

pub fn is_certificate_error(error_number: Option<i64>, message: &str) -> bool {
    if error_number == Some(CERTIFICATE_ERROR_NUMBER) {
        return true;
    }

    let lower = message.to_lowercase();
    lower.contains("certificate chain was issued by an authority that is not trusted")
        || lower.contains("ssl certificate validation")
        || lower.contains("certificate verify failed")
}

/// Case-sensitive match against the configured AAD error markers.
pub fn needs_account_refresh(message: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && message.contains(marker.as_str()))
}

pub fn classify_failure(
    profile: &ConnectionProfile,
    error_number: Option<i64>,
    message: &str,
    markers: &[String],
) -> FailureKind {
    if is_certificate_error(error_number, message) {
        FailureKind::Certificate
    } else if error_number == Some(FIREWALL_ERROR_NUMBER) {
        FailureKind::Firewall
    } else if profile.authentication_type == AuthenticationType::AzureMfa
        && needs_account_refresh(message, markers)
    {
        FailureKind::AccountRefresh
    } else {
        FailureKind::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_ACCOUNT_REFRESH_MARKERS;

    fn markers() -> Vec<String> {
        DEFAULT_ACCOUNT_REFRESH_MARKERS
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    #[test]
    fn classifies_recoverable_failures() {
        let sql = ConnectionProfile::sql_login("srv", "sa", None);
        let mut azure = ConnectionProfile::new("srv", AuthenticationType::AzureMfa);
        azure.account_id = Some("acct".into());

        assert_eq!(
            classify_failure(&sql, Some(CERTIFICATE_ERROR_NUMBER), "", &markers()),
            FailureKind::Certificate
        );
        assert_eq!(
            classify_failure(
                &sql,
                None,
                "The certificate chain was issued by an authority that is not trusted.",
                &markers()
            ),
            FailureKind::Certificate
        );
        assert_eq!(
            classify_failure(&sql, Some(FIREWALL_ERROR_NUMBER), "blocked", &markers()),
            FailureKind::Firewall
        );
        assert_eq!(
            classify_failure(&azure, None, "AADSTS70043: token expired", &markers()),
            FailureKind::AccountRefresh
        );
        assert_eq!(
            classify_failure(&sql, Some(18456), "Login failed", &markers()),
            FailureKind::Terminal
        );
    }

    #[test]
    fn marker_match_is_case_sensitive() {
        assert!(needs_account_refresh("error AADSTS50173", &markers()));
        assert!(!needs_account_refresh("error aadsts50173", &markers()));
    }

    #[test]
    fn markers_only_apply_to_azure_profiles() {
        let sql = ConnectionProfile::sql_login("srv", "sa", None);
        assert_eq!(
            classify_failure(&sql, None, "AADSTS70043", &markers()),
            FailureKind::Terminal
        );
    }

    #[test]
    fn policy_bounds_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(!policy.allows(1));
        assert!(!RetryPolicy::new(0).allows(0));
    }
}
