//! Configuration for ldauth

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdauthConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub response: ResponseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LdauthConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ConfigRead {
            path: path.to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("LDAUTH_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("LDAUTH_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(level) = std::env::var("LDAUTH_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(timeout) = std::env::var("LDAUTH_CONNECT_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                config.directory.connect_timeout_secs = t;
            }
        }
        if std::env::var("LDAUTH_EXPOSE_TRANSIENT_ERRORS")
            .map(|v| v == "true")
            .unwrap_or(false)
        {
            config.response.expose_transient_errors = true;
        }

        config
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::DEFAULT_PORT,
        }
    }
}

/// Directory connection behavior
///
/// The directory endpoint itself (URL, base DN, service account) arrives
/// per-request in headers; only connection behavior is configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Connection dial timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound on a whole bind-search-rebind sequence, in seconds
    #[serde(default = "default_request_deadline")]
    pub request_deadline_secs: u64,

    /// Use STARTTLS when connecting
    #[serde(default)]
    pub start_tls: bool,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_deadline() -> u64 {
    30
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_deadline_secs: default_request_deadline(),
            start_tls: false,
        }
    }
}

/// Response rendering behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Render directory transport failures distinguishably from credential
    /// rejections. Off by default: the legacy wire contract collapses both
    /// into one failure signal, and some front-ends depend on that.
    #[serde(default)]
    pub expose_transient_errors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LdauthConfig::default();
        assert_eq!(config.server.port, crate::DEFAULT_PORT);
        assert_eq!(config.directory.connect_timeout_secs, 10);
        assert!(!config.response.expose_transient_errors);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: LdauthConfig = toml::from_str(
            r#"
            [server]
            bind_address = "127.0.0.1"
            port = 8888

            [response]
            expose_transient_errors = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 8888);
        assert!(config.response.expose_transient_errors);
        // Sections not present fall back to defaults
        assert_eq!(config.directory.request_deadline_secs, 30);
    }
}
