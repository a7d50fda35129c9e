use std::path::PathBuf;
use std::time::Duration;

use jobline_core::staging::DeliveryMode;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for workers to drain the queue (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Behind the edge proxy: staged files are handed off instead of streamed.
    pub production: bool,
    /// Static-assets root; staged files live in its `protected/` subdirectory.
    pub static_root: PathBuf,
    /// Number of worker tasks (default: `4`).
    pub worker_count: usize,
    /// Maximum number of unclaimed jobs (default: `1024`).
    pub queue_capacity: usize,
    /// Artificial delay of the question count job (default: `10`).
    pub query_delay_secs: u64,
    /// Lifetime of finished job results (default: one day).
    pub result_ttl_secs: u64,
    /// Lifetime of staged files. `None` keeps them forever.
    pub staging_ttl_secs: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `PRODUCTION`           | `false`                    |
    /// | `STATIC_ROOT`          | `static`                   |
    /// | `WORKER_COUNT`         | `4`                        |
    /// | `QUEUE_CAPACITY`       | `1024`                     |
    /// | `QUERY_DELAY_SECS`     | `10`                       |
    /// | `RESULT_TTL_SECS`      | `86400`                    |
    /// | `STAGING_TTL_SECS`     | unset                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let production = std::env::var("PRODUCTION")
            .map(|v| parse_flag(&v).expect("PRODUCTION must be a boolean"))
            .unwrap_or(false);

        let static_root = std::env::var("STATIC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));

        let worker_count: usize = std::env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_COUNT must be a valid usize");

        let queue_capacity: usize = std::env::var("QUEUE_CAPACITY")
            .unwrap_or_else(|_| "1024".into())
            .parse()
            .expect("QUEUE_CAPACITY must be a valid usize");

        let query_delay_secs: u64 = std::env::var("QUERY_DELAY_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("QUERY_DELAY_SECS must be a valid u64");

        let result_ttl_secs: u64 = std::env::var("RESULT_TTL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("RESULT_TTL_SECS must be a valid u64");

        let staging_ttl_secs: Option<u64> = std::env::var("STAGING_TTL_SECS").ok().map(|v| {
            v.parse()
                .expect("STAGING_TTL_SECS must be a valid u64")
        });

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            production,
            static_root,
            worker_count,
            queue_capacity,
            query_delay_secs,
            result_ttl_secs,
            staging_ttl_secs,
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::from_production_flag(self.production)
    }

    pub fn query_delay(&self) -> Duration {
        Duration::from_secs(self.query_delay_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn staging_ttl(&self) -> Option<Duration> {
        self.staging_ttl_secs.map(Duration::from_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Parse a boolean environment value. Accepts `1/true/yes/on` and
/// `0/false/no/off`, case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_accepts_common_spellings() {
        for v in ["1", "true", "TRUE", "Yes", " on "] {
            assert_eq!(parse_flag(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "off", ""] {
            assert_eq!(parse_flag(v), Some(false), "{v}");
        }
        assert_eq!(parse_flag("maybe"), None);
    }
}
