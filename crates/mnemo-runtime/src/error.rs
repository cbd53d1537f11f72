use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Aggregates every sub-crate's error type behind one boundary, the way
/// `agtrace-runtime::Error` wraps `agtrace-index`/`agtrace-providers`.
#[derive(Debug)]
pub enum Error {
    Index(mnemo_index::Error),
    Engine(mnemo_engine::Error),
    Sync(mnemo_sync::Error),
    Webhook(mnemo_webhook::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(String),
    NotInitialized(String),
    Router(mnemo_types::RouterError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "index error: {}", err),
            Error::Engine(err) => write!(f, "engine error: {}", err),
            Error::Sync(err) => write!(f, "sync error: {}", err),
            Error::Webhook(err) => write!(f, "webhook error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Config(msg) => write!(f, "config error: {}", msg),
            Error::NotInitialized(msg) => write!(f, "workspace not initialized: {}", msg),
            Error::Router(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Sync(err) => Some(err),
            Error::Webhook(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Config(_) | Error::NotInitialized(_) => None,
            Error::Router(err) => Some(err),
        }
    }
}

impl From<mnemo_index::Error> for Error {
    fn from(err: mnemo_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<mnemo_engine::Error> for Error {
    fn from(err: mnemo_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<mnemo_sync::Error> for Error {
    fn from(err: mnemo_sync::Error) -> Self {
        Error::Sync(err)
    }
}

impl From<mnemo_webhook::Error> for Error {
    fn from(err: mnemo_webhook::Error) -> Self {
        Error::Webhook(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<mnemo_core::Error> for Error {
    fn from(err: mnemo_core::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<mnemo_types::RouterError> for Error {
    fn from(err: mnemo_types::RouterError) -> Self {
        Error::Router(err)
    }
}
