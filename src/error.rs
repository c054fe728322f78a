use thiserror::Error;

/// Everything that can go wrong while probing the database.
///
/// Every variant ends up in the same `Error: ...` response body, so the
/// `Display` text is what the client sees.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("missing environment variable '{0}'")]
    MissingVar(&'static str),

    #[error("invalid value for environment variable '{name}': {reason}")]
    InvalidVar { name: &'static str, reason: String },

    #[error("TLS connector setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("{}", describe_postgres_error(.0))]
    Connect(#[from] tokio_postgres::Error),

    #[error("connection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ProbeError {
    pub fn invalid_var(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidVar {
            name,
            reason: reason.into(),
        }
    }

    /// True for failures caused by configuration rather than the database.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingVar(_) | Self::InvalidVar { .. })
    }
}

// tokio-postgres keeps the io error as its source, and its own Display only
// says "error connecting to server". Append the source so the body carries
// the OS wording (e.g. "Connection refused").
fn describe_postgres_error(err: &tokio_postgres::Error) -> String {
    let mut message = err.to_string();
    if let Some(source) = std::error::Error::source(err) {
        let detail = source.to_string();
        if !message.contains(&detail) {
            message.push_str(": ");
            message.push_str(&detail);
        }
    }
    message
}

pub type ProbeResult<T> = Result<T, ProbeError>;
