use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::session::{InteractionContext, Session};
use tracing::{debug, info, warn};

/// Moves the interaction context between the top-level document and a
/// nested one.
#[derive(Clone, Copy)]
pub struct ContextSwitcher<'s> {
    session: &'s Session,
}

impl<'s> ContextSwitcher<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Enter the document inside `frame`.
    ///
    /// The returned guard must be released with [`NestedContext::release`]
    /// on every exit path; it is the only way back to top level that keeps
    /// the pairing visible at the call site.
    pub async fn enter_nested(
        &self,
        frame: &ElementHandle,
    ) -> Result<NestedContext<'s>, AutomationError> {
        self.switch_into(frame).await?;
        Ok(NestedContext {
            session: self.session,
            released: false,
        })
    }

    /// Switch into `frame` without handing out a guard. Used to restore a
    /// context that someone else already owns.
    pub(crate) async fn switch_into(&self, frame: &ElementHandle) -> Result<(), AutomationError> {
        if !self.session.is_current(frame) {
            return Err(AutomationError::ContextError(format!(
                "Frame handle {} is stale (obtained in {})",
                frame.describe(),
                frame.context()
            )));
        }
        self.session
            .engine()
            .enter_frame(frame)
            .await
            .map_err(|e| match e {
                AutomationError::ContextError(_) => e,
                other => AutomationError::ContextError(other.to_string()),
            })?;
        let nested = InteractionContext::Nested {
            frame: frame.matched_by().clone(),
        };
        info!(context = %nested, "Switched into nested document");
        self.session.set_context(nested);
        Ok(())
    }

    /// Return to the top-level document. Idempotent and infallible: errors
    /// from the driver (typically "already there") are logged and swallowed.
    pub async fn return_to_top(&self) {
        let was = self.session.active_context();
        if let Err(e) = self.session.engine().enter_top_level().await {
            debug!("Ignoring error while returning to top-level: {}", e);
        }
        if !was.is_top_level() {
            info!(from = %was, "Returned to top-level document");
            self.session.set_context(InteractionContext::TopLevel);
        }
    }
}

/// Scoped ownership of a nested context.
#[must_use = "a nested context must be released with `release().await`"]
pub struct NestedContext<'s> {
    session: &'s Session,
    released: bool,
}

impl NestedContext<'_> {
    pub async fn release(mut self) {
        self.released = true;
        ContextSwitcher::new(self.session).return_to_top().await;
    }
}

impl Drop for NestedContext<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                context = %self.session.active_context(),
                "Nested context dropped without release; the next top-level operation may target the wrong document"
            );
        }
    }
}
