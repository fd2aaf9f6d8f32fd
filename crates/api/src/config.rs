/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8700`).
    pub port: u16,
    /// Seconds between liveness sweep passes (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// HTTP request timeout in seconds (default: `15`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `15`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default   |
    /// |---------------------------|-----------|
    /// | `HOST`                    | `0.0.0.0` |
    /// | `PORT`                    | `8700`    |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`      |
    /// | `REQUEST_TIMEOUT_SECS`    | `15`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `15`      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8700".into())
            .parse()
            .expect("PORT must be a valid u16");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            heartbeat_interval_secs,
            request_timeout_secs,
            shutdown_timeout_secs,
        }
    }
}
