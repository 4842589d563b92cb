//! Browser automation for recording attendance punches on a web time-clock
//!
//! A run logs into the portal, walks its navigation to the clock form (which
//! lives in an embedded document), picks the punch type for the current time
//! of day, submits it and dismisses whatever confirmation dialog follows.
//! Element lookups go through [`Locator`]s with ordered fallback strategies
//! and bounded retries; every browser call goes through one exclusively owned
//! [`Session`].

pub mod action;
pub mod config;
pub mod context;
pub mod dialog;
pub mod drivers;
pub mod element;
pub mod errors;
pub mod locator;
pub mod orchestrator;
pub mod punch;
pub mod retry;
pub mod schedule;
pub mod selector;
pub mod session;
pub mod site;
#[cfg(test)]
mod tests;

pub use action::{ActionExecutor, ActivationMethod, ActivationResult};
pub use config::{Config, Credentials, Settings};
pub use context::{ContextSwitcher, NestedContext};
pub use dialog::{DialogOutcome, DuplicateActionHandler};
pub use drivers::{create_engine, AutomationEngine, DriverOptions};
pub use element::{ElementHandle, ElementImpl};
pub use errors::AutomationError;
pub use locator::Locator;
pub use orchestrator::{CheckInOrchestrator, FlowTimings, RunOutcome, RunReport, Stage};
pub use punch::{ActionCode, DecisionSource, PunchDecision};
pub use retry::RetryPolicy;
pub use schedule::Schedule;
pub use selector::{LocationStrategy, ReadyCondition};
pub use session::{InteractionContext, Session};
pub use site::{DialogProfile, SiteProfile};

/// Start a browser session with the given driver options.
pub async fn open_session(options: &DriverOptions) -> Result<Session, AutomationError> {
    let engine = create_engine(options).await?;
    Ok(Session::new(engine))
}
