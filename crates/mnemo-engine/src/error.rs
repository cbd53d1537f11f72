use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    NodeNotFound(String),
    Index(mnemo_index::Error),
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NodeNotFound(id) => write!(f, "node not found: {}", id),
            Error::Index(err) => write!(f, "index error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NodeNotFound(_) => None,
            Error::Index(err) => Some(err),
            Error::Json(err) => Some(err),
        }
    }
}

impl From<mnemo_index::Error> for Error {
    fn from(err: mnemo_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
