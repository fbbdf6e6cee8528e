use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    /// Device unreachable, connection refused, request timed out
    #[error("Transport error ({context}): {message}")]
    Transport { context: String, message: String },

    /// Device answered with something we could not understand
    #[error("Protocol error ({context}): {message}")]
    Protocol { context: String, message: String },

    /// Bad locator syntax or command parameters; raised before any device call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Locator matched nothing
    #[error("No element matched '{selector}'")]
    NoSuchElement { selector: String },

    /// Handle can no longer be resolved against the current UI
    #[error("Element '{handle}' is stale: {reason}")]
    StaleElementReference { handle: String, reason: String },

    /// Target unreachable within the move budget, or a focus cycle was detected
    #[error("Could not move focus to {target} after {moves} moves: {reason}")]
    FocusNavigation {
        target: String,
        moves: usize,
        reason: String,
    },

    /// Install/activate failed while starting a session
    #[error("Session not created: {0}")]
    SessionNotCreated(String),

    /// Command aborted between navigation steps
    #[error("Command cancelled after {moves} navigation moves")]
    Cancelled { moves: usize },

    #[error("No such context: {0}")]
    NoSuchContext(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    pub fn transport(context: impl Into<String>, message: impl ToString) -> Self {
        DriverError::Transport {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn protocol(context: impl Into<String>, message: impl ToString) -> Self {
        DriverError::Protocol {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// W3C WebDriver error code for the hosting automation server.
    pub fn w3c_code(&self) -> &'static str {
        match self {
            DriverError::InvalidArgument(_) => "invalid argument",
            DriverError::NoSuchElement { .. } => "no such element",
            DriverError::StaleElementReference { .. } => "stale element reference",
            DriverError::SessionNotCreated(_) => "session not created",
            DriverError::NoSuchContext(_) => "no such context",
            DriverError::UnknownCommand(_) => "unknown command",
            DriverError::Transport { .. }
            | DriverError::Protocol { .. }
            | DriverError::FocusNavigation { .. }
            | DriverError::Cancelled { .. }
            | DriverError::Io { .. } => "unknown error",
        }
    }

    /// Transport failures are the only ones a read call may retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, DriverError::Transport { .. })
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        let context = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "request".to_string());
        DriverError::Transport {
            context,
            message: err.to_string(),
        }
    }
}

impl From<quick_xml::Error> for DriverError {
    fn from(err: quick_xml::Error) -> Self {
        DriverError::protocol("xml", err)
    }
}
