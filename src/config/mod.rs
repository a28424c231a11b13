// Configuration module entry point
// Manages application configuration and shared runtime state

mod state;
mod types;

use config::builder::DefaultState;
use config::ConfigBuilder;
use std::net::SocketAddr;
use std::time::Duration;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, CorsConfig, DatabaseConfig, HealthConfig, HttpConfig, LoggingConfig,
    PerformanceConfig, ServerConfig, StoreBackend,
};

/// Default config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Upper bound for timeout settings (one day)
const MAX_TIMEOUT_SECS: u64 = 86_400;

impl Config {
    /// Load configuration from specified file path (with or without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the file (optional),
    /// `BOOKSTORE_*` environment variables (`__` separates sections).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("BOOKSTORE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("http.cors.allow_methods")
                    .with_list_parse_key("http.cors.allow_headers"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse configuration from an inline TOML document over the defaults
    #[cfg(test)]
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        let cfg: Self = Self::defaults()?
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.backend", "mongodb")?
            .set_default("database.uri", "mongodb://localhost:27017")?
            .set_default("database.name", "bookstore")?
            .set_default("database.collection", "books")?
            .set_default("database.timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_timeout", 10)?
            .set_default(
                "http.server_name",
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("http.cors.allow_origin", "http://localhost:5173")?
            .set_default(
                "http.cors.allow_methods",
                vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"],
            )?
            .set_default(
                "http.cors.allow_headers",
                vec!["Origin", "Content-Type", "Authorization"],
            )?
            .set_default("http.cors.max_age_secs", 43_200) // 12h
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.database.timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "database.timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (key, secs) in [
            ("database.timeout_secs", self.database.timeout_secs),
            ("performance.shutdown_timeout", self.performance.shutdown_timeout),
        ] {
            if secs > MAX_TIMEOUT_SECS {
                return Err(config::ConfigError::Message(format!(
                    "{key} must be at most {MAX_TIMEOUT_SECS} seconds"
                )));
            }
        }
        if !self.health.liveness_path.starts_with('/') || !self.health.readiness_path.starts_with('/')
        {
            return Err(config::ConfigError::Message(
                "health check paths must start with '/'".to_string(),
            ));
        }
        self.socket_addr()
            .map(|_| ())
            .map_err(config::ConfigError::Message)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Deadline budget for a single store call
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.database.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database.backend, StoreBackend::Mongodb);
        assert_eq!(cfg.database.uri, "mongodb://localhost:27017");
        assert_eq!(cfg.database.name, "bookstore");
        assert_eq!(cfg.database.collection, "books");
        assert_eq!(cfg.store_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.http.cors.allow_origin, "http://localhost:5173");
        assert_eq!(
            cfg.http.cors.allow_methods,
            vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        );
        assert_eq!(
            cfg.http.cors.allow_headers,
            vec!["Origin", "Content-Type", "Authorization"]
        );
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.readiness_path, "/readyz");
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let cfg = Config::from_toml(
            r#"
            [server]
            port = 9090

            [database]
            backend = "memory"
            timeout_secs = 3

            [http.cors]
            allow_origin = "https://books.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.database.backend, StoreBackend::Memory);
        assert_eq!(cfg.store_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.http.cors.allow_origin, "https://books.example.com");
        // untouched keys keep their defaults
        assert_eq!(cfg.http.cors.max_age_secs, 43_200);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = Config::from_toml("[database]\ntimeout_secs = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unbounded_timeouts() {
        let result = Config::from_toml("[database]\ntimeout_secs = 9223372036854775807\n");
        assert!(result.is_err());
        let result = Config::from_toml("[performance]\nshutdown_timeout = 86401\n");
        assert!(result.is_err());
        assert!(Config::from_toml("[database]\ntimeout_secs = 86400\n").is_ok());
    }

    #[test]
    fn test_rejects_bad_host() {
        let result = Config::from_toml("[server]\nhost = \"not a host\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::load_from("does-not-exist/bookstore").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
    }
}
