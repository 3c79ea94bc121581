//! Response rendering
//!
//! The front-end proxy inspects only headers: every verdict, including
//! failure, travels in `Auth-Status` on an HTTP 200. The status line never
//! carries the outcome.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ldauth_directory::DirectoryOutcome;

use crate::translate::{AuthAttempt, AUTH_PORT, AUTH_SERVER};

/// Outbound status header
pub const AUTH_STATUS: &str = "Auth-Status";

/// Literal success token
pub const STATUS_OK: &str = "OK";

pub fn success(attempt: &AuthAttempt) -> Response {
    (
        StatusCode::OK,
        [
            (AUTH_STATUS, STATUS_OK.to_string()),
            (AUTH_SERVER, attempt.upstream_server.clone()),
            (AUTH_PORT, attempt.upstream_port.clone()),
        ],
    )
        .into_response()
}

pub fn failure(reason: String) -> Response {
    (StatusCode::OK, [(AUTH_STATUS, reason)]).into_response()
}

/// Map a directory outcome onto the header contract.
///
/// Failure texts name the step and the user, never the password. With
/// `expose_transient_errors` off, transport failures render exactly like a
/// credential rejection, which is what the legacy wire contract promises.
pub fn render(
    outcome: DirectoryOutcome,
    attempt: &AuthAttempt,
    expose_transient_errors: bool,
) -> Response {
    match outcome {
        DirectoryOutcome::Authenticated => success(attempt),
        DirectoryOutcome::UserNotFound => {
            failure(format!("Unable to locate user {}", attempt.login()))
        }
        DirectoryOutcome::InvalidCredentials => {
            failure(format!("Unable to authenticate user {}", attempt.login()))
        }
        DirectoryOutcome::ConnectionFailed(stage) => {
            if expose_transient_errors {
                failure(format!("Directory unavailable: {stage}"))
            } else {
                failure(format!("Unable to authenticate user {}", attempt.login()))
            }
        }
    }
}
