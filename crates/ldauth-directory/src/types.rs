//! Directory authentication types

use secrecy::SecretString;
use thiserror::Error;

// ============================================================================
// Request
// ============================================================================

/// Where to authenticate: the directory endpoint and the service account
/// used for the initial bind and user search.
#[derive(Debug)]
pub struct DirectoryTarget {
    /// Directory URL (ldap:// or ldaps://)
    pub url: String,

    /// Base DN for the user subtree search
    pub base_dn: String,

    /// Service account DN
    pub bind_dn: String,

    /// Service account password
    pub bind_password: SecretString,
}

/// One credential verification against one directory endpoint.
#[derive(Debug)]
pub struct AuthRequest {
    pub target: DirectoryTarget,

    /// User id matched against the `uid` attribute
    pub login: String,

    /// Password to verify by rebinding as the located DN
    pub password: SecretString,
}

// ============================================================================
// Outcome
// ============================================================================

/// Definitive result of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// The directory accepted the rebind as the located user
    Authenticated,
    /// The search matched zero entries, or more than one
    UserNotFound,
    /// The located user's rebind was refused
    InvalidCredentials,
    /// Infrastructure failure before the directory could give a verdict
    ConnectionFailed(FailedStage),
}

impl DirectoryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DirectoryOutcome::Authenticated)
    }

    /// Transport failures are retryable by the caller; rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryOutcome::ConnectionFailed(_))
    }
}

/// Which step of the protocol failed at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Connect,
    ServiceBind,
    Search,
    Deadline,
}

impl std::fmt::Display for FailedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailedStage::Connect => "connect",
            FailedStage::ServiceBind => "service-bind",
            FailedStage::Search => "search",
            FailedStage::Deadline => "deadline",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Wire-level errors
// ============================================================================

/// Failure of a single directory operation. Carries no credential material;
/// the step sequence maps it into a `DirectoryOutcome` by context.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("bind refused with result code {rc}")]
    BindRefused { rc: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_predicates() {
        assert!(DirectoryOutcome::Authenticated.is_success());
        assert!(!DirectoryOutcome::UserNotFound.is_success());
        assert!(DirectoryOutcome::ConnectionFailed(FailedStage::Search).is_transient());
        assert!(!DirectoryOutcome::InvalidCredentials.is_transient());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(FailedStage::ServiceBind.to_string(), "service-bind");
        assert_eq!(FailedStage::Connect.to_string(), "connect");
    }

    #[test]
    fn test_request_debug_redacts_passwords() {
        let request = AuthRequest {
            target: DirectoryTarget {
                url: "ldap://localhost:389".to_string(),
                base_dn: "dc=example,dc=com".to_string(),
                bind_dn: "cn=admin,dc=example,dc=com".to_string(),
                bind_password: SecretString::from("service-secret".to_string()),
            },
            login: "jdoe".to_string(),
            password: SecretString::from("hunter2".to_string()),
        };

        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("service-secret"));
    }
}
