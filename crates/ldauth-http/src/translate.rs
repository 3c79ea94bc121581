//! Request translation
//!
//! Parses the header set the front-end proxy forwards into a structured
//! authentication attempt. Pure and synchronous; malformed requests are
//! rejected here before any directory I/O happens.

use axum::http::HeaderMap;
use ldauth_directory::{AuthRequest, DirectoryTarget};
use secrecy::SecretString;
use thiserror::Error;

// Inbound header names, as the nginx mail auth_http protocol sends them
pub const AUTH_METHOD: &str = "Auth-Method";
pub const AUTH_USER: &str = "Auth-User";
pub const AUTH_PASS: &str = "Auth-Pass";
pub const AUTH_SERVER: &str = "Auth-Server";
pub const AUTH_PORT: &str = "Auth-Port";
pub const X_LDAP_URL: &str = "X-Ldap-URL";
pub const X_LDAP_BASE_DN: &str = "X-Ldap-BaseDN";
pub const X_LDAP_BIND_DN: &str = "X-Ldap-BindDN";
pub const X_LDAP_BIND_PASS: &str = "X-Ldap-BindPass";

/// A fully validated authentication attempt.
///
/// Either every field is present and well-formed, or construction failed
/// and the authenticator never sees the request.
#[derive(Debug)]
pub struct AuthAttempt {
    /// Always `"plain"` once validation has passed
    pub method: String,

    /// Domain half of the login; validated but not used to scope the
    /// directory search (single-realm deployment)
    pub domain: String,

    /// Upstream the proxy routes to on success; echoed back verbatim
    pub upstream_server: String,
    pub upstream_port: String,

    /// The directory-facing half of the attempt
    pub directory: AuthRequest,
}

impl AuthAttempt {
    pub fn login(&self) -> &str {
        &self.directory.login
    }
}

// Equivalent to a `#[derive(PartialEq)]`, written by hand because the
// `SecretString` fields reached through `directory` do not implement
// `PartialEq` (and those types live in another crate). Compares every field,
// exposing the secrets so equality stays total.
impl PartialEq for AuthAttempt {
    fn eq(&self, other: &Self) -> bool {
        use secrecy::ExposeSecret;
        self.method == other.method
            && self.domain == other.domain
            && self.upstream_server == other.upstream_server
            && self.upstream_port == other.upstream_port
            && self.directory.login == other.directory.login
            && self.directory.password.expose_secret()
                == other.directory.password.expose_secret()
            && self.directory.target.url == other.directory.target.url
            && self.directory.target.base_dn == other.directory.target.base_dn
            && self.directory.target.bind_dn == other.directory.target.bind_dn
            && self.directory.target.bind_password.expose_secret()
                == other.directory.target.bind_password.expose_secret()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported authentication method {0}")]
    UnsupportedMethod(String),

    #[error("Must supply Auth-Server and Auth-Port via HTTP header")]
    MissingRouteInfo,

    #[error("Username must contain both user id and domain")]
    MalformedIdentity,
}

/// Translate the inbound header set into an attempt.
///
/// Rules apply in order; the first failure wins.
pub fn translate(headers: &HeaderMap) -> Result<AuthAttempt, ValidationError> {
    let method = header_value(headers, AUTH_METHOD);
    if method != "plain" {
        return Err(ValidationError::UnsupportedMethod(method.to_string()));
    }

    let upstream_server = header_value(headers, AUTH_SERVER);
    let upstream_port = header_value(headers, AUTH_PORT);
    if upstream_server.is_empty() || upstream_port.is_empty() {
        return Err(ValidationError::MissingRouteInfo);
    }

    let (login, domain) = split_identity(header_value(headers, AUTH_USER))?;

    // Directory fields pass through verbatim; empty values surface as
    // connection errors in the directory step.
    Ok(AuthAttempt {
        method: method.to_string(),
        domain,
        upstream_server: upstream_server.to_string(),
        upstream_port: upstream_port.to_string(),
        directory: AuthRequest {
            target: DirectoryTarget {
                url: header_value(headers, X_LDAP_URL).to_string(),
                base_dn: header_value(headers, X_LDAP_BASE_DN).to_string(),
                bind_dn: header_value(headers, X_LDAP_BIND_DN).to_string(),
                bind_password: SecretString::from(
                    header_value(headers, X_LDAP_BIND_PASS).to_string(),
                ),
            },
            login,
            password: SecretString::from(header_value(headers, AUTH_PASS).to_string()),
        },
    })
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// The identity must be `login@domain` with both halves non-empty.
fn split_identity(raw: &str) -> Result<(String, String), ValidationError> {
    let mut parts = raw.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(login), Some(domain), None) if !login.is_empty() && !domain.is_empty() => {
            Ok((login.to_string(), domain.to_string()))
        }
        _ => Err(ValidationError::MalformedIdentity),
    }
}
