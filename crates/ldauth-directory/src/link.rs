//! Seams between the authentication flow and the wire protocol
//!
//! `DirectoryConnector`/`DirectoryLink` model the directory as an external
//! capability (connect, bind, search) so the step sequence can be exercised
//! against a scripted double. `UserAuthenticator` is the object-safe
//! surface the HTTP layer consumes.

use async_trait::async_trait;

use crate::types::{AuthRequest, DirectoryError, DirectoryOutcome};

/// Opens connections to a directory endpoint.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    type Link: DirectoryLink;

    async fn connect(&self, url: &str) -> Result<Self::Link, DirectoryError>;
}

/// One live directory connection.
///
/// A link is exclusively owned by a single authentication attempt. A second
/// `bind` on the same link replaces its authentication context, which is how
/// the user's password is verified after the service-account search.
#[async_trait]
pub trait DirectoryLink: Send {
    /// Authenticate this connection as `dn`.
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Subtree search returning the DNs of all matching entries.
    async fn locate(&mut self, base_dn: &str, filter: &str) -> Result<Vec<String>, DirectoryError>;

    /// Release the connection. Called exactly once on every exit path.
    async fn close(&mut self);
}

/// Verifies one credential set end to end.
#[async_trait]
pub trait UserAuthenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> DirectoryOutcome;
}
