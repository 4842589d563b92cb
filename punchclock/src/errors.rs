use thiserror::Error;

use crate::orchestrator::Stage;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {element} (after {attempts} attempt(s))")]
    ElementNotFound { element: String, attempts: u32 },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Interaction blocked: {0}")]
    InteractionBlocked(String),

    #[error("Context switch failed: {0}")]
    ContextError(String),

    #[error("Authentication incomplete: {0}")]
    AuthenticationIncomplete(String),

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<AutomationError>,
    },

    #[error("Element handle is stale: {0}")]
    StaleElement(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Driver error: {0}")]
    PlatformError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// Wraps `self` as the cause of a failed orchestrator stage.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            already @ AutomationError::StageFailed { .. } => already,
            other => AutomationError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Short machine-friendly name of the error kind, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AutomationError::ElementNotFound { .. } => "NotFound",
            AutomationError::Timeout(_) => "Timeout",
            AutomationError::InteractionBlocked(_) => "InteractionBlocked",
            AutomationError::ContextError(_) => "ContextError",
            AutomationError::AuthenticationIncomplete(_) => "AuthenticationIncomplete",
            AutomationError::StageFailed { source, .. } => source.kind(),
            AutomationError::StaleElement(_) => "StaleElement",
            AutomationError::InvalidSelector(_) => "InvalidSelector",
            AutomationError::InvalidArgument(_) => "InvalidArgument",
            AutomationError::PlatformError(_) => "PlatformError",
            AutomationError::Internal(_) => "Internal",
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AutomationError::ElementNotFound { .. } => true,
            AutomationError::StageFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<fantoccini::error::CmdError> for AutomationError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        AutomationError::PlatformError(e.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for AutomationError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        AutomationError::PlatformError(format!("Failed to start WebDriver session: {e}"))
    }
}
