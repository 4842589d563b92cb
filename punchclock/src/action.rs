use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::session::Session;
use std::fmt;
use tracing::{debug, info, warn};

/// Which interaction ended up activating the element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMethod {
    /// Standard click with normal hit-testing
    Primary,
    /// Programmatic click dispatched by script
    Fallback,
}

impl fmt::Display for ActivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationMethod::Primary => write!(f, "primary"),
            ActivationMethod::Fallback => write!(f, "fallback"),
        }
    }
}

pub struct ActivationResult {
    pub method: ActivationMethod,
    pub details: String,
}

/// Activates elements with a scripted fallback when the normal click is
/// blocked (obscured, not interactable, stale).
#[derive(Clone, Copy)]
pub struct ActionExecutor<'s> {
    session: &'s Session,
}

impl<'s> ActionExecutor<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Best-effort activation: `true` iff the primary or the fallback
    /// interaction completed. Never errors.
    pub async fn activate(&self, handle: &ElementHandle) -> bool {
        match self.try_activate(handle).await {
            Ok(result) => {
                info!(
                    method = %result.method,
                    element = %handle.describe(),
                    "Activated element: {}", result.details
                );
                true
            }
            Err(e) => {
                warn!(element = %handle.describe(), "Failed to activate element: {}", e);
                false
            }
        }
    }

    /// Same as [`activate`](Self::activate) but reports how it went.
    pub async fn try_activate(
        &self,
        handle: &ElementHandle,
    ) -> Result<ActivationResult, AutomationError> {
        if !self.session.is_current(handle) {
            return Err(AutomationError::StaleElement(format!(
                "{} was obtained in {} (generation {}) but the session is now in {} (generation {})",
                handle.describe(),
                handle.context(),
                handle.generation(),
                self.session.active_context(),
                self.session.generation()
            )));
        }

        if let Err(e) = handle.scroll_into_view().await {
            debug!("scroll_into_view failed, clicking anyway: {}", e);
        }

        let primary_error = match handle.click().await {
            Ok(()) => {
                return Ok(ActivationResult {
                    method: ActivationMethod::Primary,
                    details: "standard click".to_string(),
                })
            }
            Err(e) => e,
        };

        warn!(
            element = %handle.describe(),
            "Standard click blocked ({}), falling back to scripted click", primary_error
        );

        match handle.script_click().await {
            Ok(()) => Ok(ActivationResult {
                method: ActivationMethod::Fallback,
                details: format!("scripted click after: {primary_error}"),
            }),
            Err(fallback_error) => Err(AutomationError::InteractionBlocked(format!(
                "{}: standard click failed ({primary_error}); scripted click failed ({fallback_error})",
                handle.describe()
            ))),
        }
    }
}
