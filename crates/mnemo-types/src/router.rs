use std::fmt;

/// Error kinds returned at the router boundary as `{ok:false, error:<kind>}`
/// (§7). `Display` renders the wire-format string for each kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    NoActiveTab,
    NoReceiver,
    MissingPermission,
    MissingPermissionNetwork,
    MissingHostPermission { origin: String },
    UnknownConnector,
    ConnectorDisabled,
    NoConnector,
    MissingConnector,
    Http(u16),
    Exception(String),
    InvalidUrl,
    InvalidJson,
    ScriptNotEnabled,
    NoActionHandler,
    UnknownAction,
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::NoActiveTab => write!(f, "no_active_tab"),
            RouterError::NoReceiver => write!(f, "no_receiver"),
            RouterError::MissingPermission => write!(f, "missing_permission"),
            RouterError::MissingPermissionNetwork => write!(f, "missing_permission_network"),
            RouterError::MissingHostPermission { origin } => {
                write!(f, "missing_host_permission:{}", origin)
            }
            RouterError::UnknownConnector => write!(f, "unknown_connector"),
            RouterError::ConnectorDisabled => write!(f, "connector_disabled"),
            RouterError::NoConnector => write!(f, "no_connector"),
            RouterError::MissingConnector => write!(f, "missing_connector"),
            RouterError::Http(code) => write!(f, "http_{}", code),
            RouterError::Exception(msg) => write!(f, "{}", msg),
            RouterError::InvalidUrl => write!(f, "invalid_url"),
            RouterError::InvalidJson => write!(f, "invalid_json"),
            RouterError::ScriptNotEnabled => write!(f, "script_not_enabled"),
            RouterError::NoActionHandler => write!(f, "no_action_handler"),
            RouterError::UnknownAction => write!(f, "unknown_action"),
        }
    }
}

impl std::error::Error for RouterError {}

pub type RouterResult<T> = std::result::Result<T, RouterError>;
