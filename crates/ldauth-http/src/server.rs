//! The auth bridge server

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Router;
use ldauth_core::{LdauthConfig, Result};
use ldauth_directory::{LdapAuthenticator, LdapSettings, UserAuthenticator};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::respond;
use crate::translate;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LdauthConfig>,
    pub authenticator: Arc<dyn UserAuthenticator>,
}

/// HTTP auth bridge server
pub struct AuthServer {
    config: LdauthConfig,
}

impl AuthServer {
    pub fn new(config: LdauthConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let settings = LdapSettings {
            connect_timeout: Duration::from_secs(self.config.directory.connect_timeout_secs),
            request_deadline: Duration::from_secs(self.config.directory.request_deadline_secs),
            start_tls: self.config.directory.start_tls,
        };

        let state = AppState {
            authenticator: Arc::new(LdapAuthenticator::new(settings)),
            config: Arc::new(self.config),
        };

        let addr = format!(
            "{}:{}",
            state.config.server.bind_address, state.config.server.port
        );
        let listener = TcpListener::bind(&addr).await?;

        info!("ldauth listening on http://{}", addr);

        axum::serve(listener, router(state)).await?;
        Ok(())
    }
}

/// The front-end proxy points its auth subrequest location wherever it
/// likes, so every path reaches the handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_auth)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_auth(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let attempt = match translate::translate(&headers) {
        Ok(attempt) => attempt,
        Err(e) => {
            warn!(error = %e, "rejected malformed authentication request");
            return respond::failure(e.to_string());
        }
    };

    debug!(login = %attempt.login(), domain = %attempt.domain, "received authentication request");

    let outcome = state.authenticator.authenticate(&attempt.directory).await;

    if outcome.is_success() {
        info!(login = %attempt.login(), "authentication successful");
    } else {
        warn!(login = %attempt.login(), ?outcome, "authentication failed");
    }

    respond::render(
        outcome,
        &attempt,
        state.config.response.expose_transient_errors,
    )
}
