//! The exclusively-owned browser session and its interaction context.

use crate::drivers::AutomationEngine;
use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::locator::Locator;
use crate::selector::LocationStrategy;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Which document element operations currently target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InteractionContext {
    TopLevel,
    /// A nested document, identified by the strategy that located its frame
    Nested { frame: LocationStrategy },
}

impl InteractionContext {
    pub fn is_top_level(&self) -> bool {
        matches!(self, InteractionContext::TopLevel)
    }
}

impl fmt::Display for InteractionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionContext::TopLevel => write!(f, "top-level"),
            InteractionContext::Nested { frame } => write!(f, "nested({frame})"),
        }
    }
}

#[derive(Debug)]
struct ContextState {
    active: InteractionContext,
    /// Bumped on every context change or navigation
    generation: u64,
}

/// One live browser session, owned by exactly one run.
///
/// There is no ambient driver: everything that touches the browser borrows
/// the session explicitly. Exactly one [`InteractionContext`] is active at a
/// time and every change bumps a generation counter that invalidates
/// previously obtained [`ElementHandle`]s.
pub struct Session {
    id: Uuid,
    engine: Arc<dyn AutomationEngine>,
    state: Mutex<ContextState>,
    closed: AtomicBool,
    close_calls: AtomicU32,
}

impl Session {
    pub fn new(engine: Arc<dyn AutomationEngine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            engine,
            state: Mutex::new(ContextState {
                active: InteractionContext::TopLevel,
                generation: 0,
            }),
            closed: AtomicBool::new(false),
            close_calls: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn engine(&self) -> &Arc<dyn AutomationEngine> {
        &self.engine
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        // A poisoned lock only means another thread panicked mid-update of two
        // plain fields; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn active_context(&self) -> InteractionContext {
        self.state().active.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Whether `handle` was obtained in the context that is active right now.
    pub fn is_current(&self, handle: &ElementHandle) -> bool {
        let state = self.state();
        state.generation == handle.generation() && &state.active == handle.context()
    }

    pub(crate) fn set_context(&self, context: InteractionContext) {
        let mut state = self.state();
        state.generation += 1;
        debug!(
            from = %state.active,
            to = %context,
            generation = state.generation,
            "Interaction context changed"
        );
        state.active = context;
    }

    fn invalidate_handles(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.active = InteractionContext::TopLevel;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), AutomationError> {
        if self.is_closed() {
            return Err(AutomationError::Internal(format!(
                "Session {} is already closed",
                self.id
            )));
        }
        Ok(())
    }

    pub fn locator(
        &self,
        name: impl Into<String>,
        strategies: impl IntoIterator<Item = LocationStrategy>,
    ) -> Locator<'_> {
        Locator::new(self, name, strategies)
    }

    /// Navigate the top-level document. Invalidates every handle.
    #[instrument(level = "debug", skip(self), fields(session = %self.id))]
    pub async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.ensure_open()?;
        info!("Navigating to: {}", url);
        let result = self.engine.goto(url).await;
        self.invalidate_handles();
        result
    }

    pub async fn current_url(&self) -> Result<String, AutomationError> {
        self.ensure_open()?;
        self.engine.current_url().await
    }

    pub async fn title(&self) -> Result<String, AutomationError> {
        self.ensure_open()?;
        self.engine.title().await
    }

    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value, AutomationError> {
        self.ensure_open()?;
        self.engine.execute_script(script).await
    }

    /// Tear the session down. Safe to call more than once; only the first
    /// call reaches the driver.
    #[instrument(level = "debug", skip(self), fields(session = %self.id))]
    pub async fn close(&self) -> Result<(), AutomationError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Session already closed");
            return Ok(());
        }
        info!("Closing browser session");
        self.invalidate_handles();
        self.engine.quit().await
    }

    /// Number of times teardown was requested (for diagnostics)
    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(
                session = %self.id,
                "Session dropped without close(); the browser may still be running"
            );
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("context", &self.active_context())
            .field("closed", &self.is_closed())
            .finish()
    }
}
