//! The bind-search-rebind sequence
//!
//! Step order is load-bearing: a failure at any step short-circuits the
//! rest, and the link opened at the start is closed on every exit path.

use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::link::{DirectoryConnector, DirectoryLink};
use crate::types::{AuthRequest, DirectoryOutcome, FailedStage};

/// Subtree filter matching the person entry for `login`.
///
/// The login value is escaped, so header-supplied input cannot alter the
/// filter structure.
pub fn user_filter(login: &str) -> String {
    format!(
        "(&(objectClass=organizationalPerson)(uid={}))",
        ldap3::ldap_escape(login)
    )
}

/// Run one full authentication attempt against `connector`.
///
/// Opens a single connection, walks the three steps, and releases the
/// connection regardless of where the sequence stopped.
pub async fn authenticate_via_directory<C: DirectoryConnector>(
    connector: &C,
    request: &AuthRequest,
) -> DirectoryOutcome {
    let mut link = match connector.connect(&request.target.url).await {
        Ok(link) => link,
        Err(e) => {
            warn!(url = %request.target.url, error = %e, "failed to connect to directory");
            return DirectoryOutcome::ConnectionFailed(FailedStage::Connect);
        }
    };

    let outcome = run_steps(&mut link, request).await;
    link.close().await;
    outcome
}

async fn run_steps<L: DirectoryLink>(link: &mut L, request: &AuthRequest) -> DirectoryOutcome {
    // Step 1: authenticate the connection as the service account
    if let Err(e) = link
        .bind(
            &request.target.bind_dn,
            request.target.bind_password.expose_secret(),
        )
        .await
    {
        warn!(bind_dn = %request.target.bind_dn, error = %e, "service account bind failed");
        return DirectoryOutcome::ConnectionFailed(FailedStage::ServiceBind);
    }

    // Step 2: locate the user's DN under the base DN
    let filter = user_filter(&request.login);
    let entries = match link.locate(&request.target.base_dn, &filter).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(base_dn = %request.target.base_dn, error = %e, "user search failed");
            return DirectoryOutcome::ConnectionFailed(FailedStage::Search);
        }
    };

    // Exactly one entry is acceptable; zero and many are the same rejection.
    if entries.len() != 1 {
        info!(login = %request.login, matches = entries.len(), "no unique entry for user");
        return DirectoryOutcome::UserNotFound;
    }
    let user_dn = &entries[0];

    // Step 3: verify the password by rebinding the same connection
    match link.bind(user_dn, request.password.expose_secret()).await {
        Ok(()) => DirectoryOutcome::Authenticated,
        Err(e) => {
            info!(login = %request.login, error = %e, "user bind refused");
            DirectoryOutcome::InvalidCredentials
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DirectoryError, DirectoryTarget};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const SERVICE_DN: &str = "cn=reader,dc=example,dc=com";
    const USER_DN: &str = "uid=jdoe,ou=people,dc=example,dc=com";

    #[derive(Clone, Default)]
    struct Script {
        refuse_connect: bool,
        refuse_service_bind: bool,
        search_transport_error: bool,
        matches: Vec<String>,
        refuse_user_bind: bool,
    }

    #[derive(Default)]
    struct CallLog {
        calls: Mutex<Vec<String>>,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl CallLog {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct FakeConnector {
        script: Script,
        log: Arc<CallLog>,
    }

    struct FakeLink {
        script: Script,
        log: Arc<CallLog>,
    }

    #[async_trait]
    impl DirectoryConnector for FakeConnector {
        type Link = FakeLink;

        async fn connect(&self, url: &str) -> Result<FakeLink, DirectoryError> {
            self.log.record(format!("connect {url}"));
            if self.script.refuse_connect {
                return Err(DirectoryError::Transport("connection refused".into()));
            }
            self.log.opens.fetch_add(1, Ordering::SeqCst);
            Ok(FakeLink {
                script: self.script.clone(),
                log: self.log.clone(),
            })
        }
    }

    #[async_trait]
    impl DirectoryLink for FakeLink {
        async fn bind(&mut self, dn: &str, _password: &str) -> Result<(), DirectoryError> {
            self.log.record(format!("bind {dn}"));
            let refused = if dn == SERVICE_DN {
                self.script.refuse_service_bind
            } else {
                self.script.refuse_user_bind
            };
            if refused {
                return Err(DirectoryError::BindRefused { rc: 49 });
            }
            Ok(())
        }

        async fn locate(
            &mut self,
            base_dn: &str,
            filter: &str,
        ) -> Result<Vec<String>, DirectoryError> {
            self.log.record(format!("search {base_dn} {filter}"));
            if self.script.search_transport_error {
                return Err(DirectoryError::Transport("broken pipe".into()));
            }
            Ok(self.script.matches.clone())
        }

        async fn close(&mut self) {
            self.log.record("close");
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn harness(script: Script) -> (FakeConnector, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        (
            FakeConnector {
                script,
                log: log.clone(),
            },
            log,
        )
    }

    fn request() -> AuthRequest {
        AuthRequest {
            target: DirectoryTarget {
                url: "ldap://directory.example.com:389".to_string(),
                base_dn: "ou=people,dc=example,dc=com".to_string(),
                bind_dn: SERVICE_DN.to_string(),
                bind_password: SecretString::from("reader-secret".to_string()),
            },
            login: "jdoe".to_string(),
            password: SecretString::from("hunter2".to_string()),
        }
    }

    fn one_match() -> Script {
        Script {
            matches: vec![USER_DN.to_string()],
            ..Script::default()
        }
    }

    #[tokio::test]
    async fn test_happy_path_authenticates() {
        let (connector, log) = harness(one_match());

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(outcome, DirectoryOutcome::Authenticated);
        let calls = log.calls();
        assert_eq!(calls[0], "connect ldap://directory.example.com:389");
        assert_eq!(calls[1], format!("bind {SERVICE_DN}"));
        assert!(calls[2].starts_with("search ou=people,dc=example,dc=com"));
        assert_eq!(calls[3], format!("bind {USER_DN}"));
        assert_eq!(calls[4], "close");
    }

    #[tokio::test]
    async fn test_zero_matches_is_user_not_found() {
        let (connector, log) = harness(Script::default());

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(outcome, DirectoryOutcome::UserNotFound);
        // No rebind was attempted after the empty search
        let binds = log.calls().iter().filter(|c| c.starts_with("bind")).count();
        assert_eq!(binds, 1);
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multiple_matches_handled_like_zero() {
        let script = Script {
            matches: vec![
                USER_DN.to_string(),
                "uid=jdoe,ou=contractors,dc=example,dc=com".to_string(),
            ],
            ..Script::default()
        };
        let (connector, log) = harness(script);

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(outcome, DirectoryOutcome::UserNotFound);
        let binds = log.calls().iter().filter(|c| c.starts_with("bind")).count();
        assert_eq!(binds, 1);
    }

    #[tokio::test]
    async fn test_service_bind_failure_short_circuits() {
        let script = Script {
            refuse_service_bind: true,
            matches: vec![USER_DN.to_string()],
            ..Script::default()
        };
        let (connector, log) = harness(script);

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(
            outcome,
            DirectoryOutcome::ConnectionFailed(FailedStage::ServiceBind)
        );
        assert!(!log.calls().iter().any(|c| c.starts_with("search")));
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_transport_failure() {
        let script = Script {
            search_transport_error: true,
            ..Script::default()
        };
        let (connector, log) = harness(script);

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(
            outcome,
            DirectoryOutcome::ConnectionFailed(FailedStage::Search)
        );
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_user_bind_refusal_is_rejection_not_connection_failure() {
        let script = Script {
            refuse_user_bind: true,
            matches: vec![USER_DN.to_string()],
            ..Script::default()
        };
        let (connector, log) = harness(script);

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(outcome, DirectoryOutcome::InvalidCredentials);
        assert!(!outcome.is_transient());
        assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let script = Script {
            refuse_connect: true,
            ..Script::default()
        };
        let (connector, log) = harness(script);

        let outcome = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(
            outcome,
            DirectoryOutcome::ConnectionFailed(FailedStage::Connect)
        );
        assert_eq!(log.opens.load(Ordering::SeqCst), 0);
        assert_eq!(log.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_opened_link_is_closed_once() {
        let scripts = vec![
            one_match(),
            Script::default(),
            Script {
                refuse_service_bind: true,
                ..Script::default()
            },
            Script {
                search_transport_error: true,
                ..Script::default()
            },
            Script {
                refuse_user_bind: true,
                matches: vec![USER_DN.to_string()],
                ..Script::default()
            },
        ];

        for script in scripts {
            let (connector, log) = harness(script);
            let _ = authenticate_via_directory(&connector, &request()).await;
            assert_eq!(log.opens.load(Ordering::SeqCst), 1);
            assert_eq!(log.closes.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_repeated_attempts_yield_same_outcome() {
        let (connector, log) = harness(one_match());

        let first = authenticate_via_directory(&connector, &request()).await;
        let second = authenticate_via_directory(&connector, &request()).await;

        assert_eq!(first, DirectoryOutcome::Authenticated);
        assert_eq!(first, second);
        assert_eq!(log.opens.load(Ordering::SeqCst), 2);
        assert_eq!(log.closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_user_filter_shape() {
        assert_eq!(
            user_filter("jdoe"),
            "(&(objectClass=organizationalPerson)(uid=jdoe))"
        );
    }

    #[test]
    fn test_user_filter_escapes_metacharacters() {
        let filter = user_filter("jd(oe)*");
        assert!(filter.to_lowercase().contains(r"jd\28oe\29\2a"));
        assert!(!filter.contains("jd(oe)*"));
    }
}
