use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};

use crate::error::{ProbeError, ProbeResult};

pub const DB_HOST: &str = "DB_HOST";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASS: &str = "DB_PASS";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_SSLMODE: &str = "DB_SSLMODE";

pub const DEFAULT_DB_PORT: u16 = 5432;

/// Process-level settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("HOST must be a valid IP address")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        if port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        Ok(Config { host, port })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Where connection parameters come from.
///
/// The handler resolves parameters on every request, so the production source
/// reads the live process environment.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads `std::env` at call time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// Fixed set of variables; used by tests and by callers embedding the router.
#[derive(Debug, Default, Clone)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.vars.remove(key);
        self
    }
}

impl EnvSource for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// How the connection negotiates TLS, following libpq's `sslmode` names.
///
/// Neither `Prefer` nor `Require` checks the server certificate; only
/// encryption is negotiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslPreference {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl SslPreference {
    pub fn parse(raw: &str) -> ProbeResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslPreference::Disable),
            "prefer" => Ok(SslPreference::Prefer),
            "require" => Ok(SslPreference::Require),
            other => Err(ProbeError::invalid_var(
                DB_SSLMODE,
                format!("'{}' is not one of disable, prefer, require", other),
            )),
        }
    }
}

/// The four values needed to open a connection, plus the optional port and
/// TLS mode.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: SslPreference,
}

impl DatabaseParams {
    /// Resolves parameters without validation or defaults for the four
    /// required variables. The first missing one is reported.
    pub fn from_source(source: &dyn EnvSource) -> ProbeResult<Self> {
        let required = |key: &'static str| source.var(key).ok_or(ProbeError::MissingVar(key));

        let host = required(DB_HOST)?;
        let database = required(DB_NAME)?;
        let user = required(DB_USER)?;
        let password = required(DB_PASS)?;

        let port = match source.var(DB_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ProbeError::invalid_var(DB_PORT, e.to_string()))?,
            None => DEFAULT_DB_PORT,
        };

        let ssl_mode = match source.var(DB_SSLMODE) {
            Some(raw) => SslPreference::parse(&raw)?,
            None => SslPreference::default(),
        };

        Ok(DatabaseParams {
            host,
            port,
            database,
            user,
            password,
            ssl_mode,
        })
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for DatabaseParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}
