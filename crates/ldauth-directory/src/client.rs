//! LDAP-backed connector
//!
//! Implements the directory seams over `ldap3`. Supports LDAP, LDAPS, and
//! STARTTLS connections.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use tracing::{debug, warn};

use crate::flow::authenticate_via_directory;
use crate::link::{DirectoryConnector, DirectoryLink, UserAuthenticator};
use crate::types::{AuthRequest, DirectoryError, DirectoryOutcome, FailedStage};

/// Connection behavior, mirrored from server configuration.
#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Dial timeout for the TCP/TLS connection
    pub connect_timeout: Duration,

    /// Upper bound on one whole bind-search-rebind sequence
    pub request_deadline: Duration,

    /// Upgrade the connection with STARTTLS after connecting
    pub start_tls: bool,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_deadline: Duration::from_secs(30),
            start_tls: false,
        }
    }
}

/// Opens `ldap3` connections to whatever endpoint a request names.
pub struct LdapConnector {
    settings: LdapSettings,
}

impl LdapConnector {
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    type Link = LdapLink;

    async fn connect(&self, url: &str) -> Result<LdapLink, DirectoryError> {
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.connect_timeout)
            .set_starttls(self.settings.start_tls);

        debug!(url, "connecting to directory");

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, url)
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "directory connection terminated");
            }
        });

        Ok(LdapLink { ldap })
    }
}

/// One live `ldap3` connection.
pub struct LdapLink {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryLink for LdapLink {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        if result.rc != 0 {
            return Err(DirectoryError::BindRefused { rc: result.rc });
        }
        Ok(())
    }

    async fn locate(&mut self, base_dn: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        let (entries, _res) = self
            .ldap
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .search(base_dn, Scope::Subtree, filter, vec!["dn"])
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| SearchEntry::construct(entry).dn)
            .collect())
    }

    async fn close(&mut self) {
        let _ = self.ldap.unbind().await;
    }
}

/// Production authenticator: the LDAP connector plus a request deadline.
pub struct LdapAuthenticator {
    connector: LdapConnector,
    deadline: Duration,
}

impl LdapAuthenticator {
    pub fn new(settings: LdapSettings) -> Self {
        Self {
            deadline: settings.request_deadline,
            connector: LdapConnector::new(settings),
        }
    }
}

#[async_trait]
impl UserAuthenticator for LdapAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> DirectoryOutcome {
        let attempt = authenticate_via_directory(&self.connector, request);
        match tokio::time::timeout(self.deadline, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(url = %request.target.url, "authentication attempt exceeded deadline");
                DirectoryOutcome::ConnectionFailed(FailedStage::Deadline)
            }
        }
    }
}
