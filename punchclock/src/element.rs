use crate::errors::AutomationError;
use crate::selector::LocationStrategy;
use crate::session::InteractionContext;
use std::fmt::{self, Debug};
use tracing::instrument;

/// Interface for driver-specific element implementations
#[async_trait::async_trait]
pub trait ElementImpl: Send + Sync + Debug {
    /// Short human-readable description used in logs (tag, id, name)
    fn describe(&self) -> String;
    async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError>;
    /// Live DOM property (e.g. `href` resolved to an absolute URL)
    async fn property(&self, name: &str) -> Result<Option<String>, AutomationError>;
    async fn text(&self) -> Result<String, AutomationError>;
    async fn is_displayed(&self) -> Result<bool, AutomationError>;
    async fn is_enabled(&self) -> Result<bool, AutomationError>;
    async fn scroll_into_view(&self) -> Result<(), AutomationError>;
    /// Standard interaction, subject to normal hit-testing
    async fn click(&self) -> Result<(), AutomationError>;
    /// Programmatic activation that bypasses hit-testing
    async fn script_click(&self) -> Result<(), AutomationError>;
    async fn clear(&self) -> Result<(), AutomationError>;
    async fn send_keys(&self, text: &str) -> Result<(), AutomationError>;
    async fn select_by_label(&self, label: &str) -> Result<(), AutomationError>;
    async fn option_labels(&self) -> Result<Vec<String>, AutomationError>;
    async fn selected_label(&self) -> Result<Option<String>, AutomationError>;
    async fn find_descendant(
        &self,
        strategy: &LocationStrategy,
    ) -> Result<Option<Box<dyn ElementImpl>>, AutomationError>;
    fn as_any(&self) -> &dyn std::any::Any;
    fn clone_box(&self) -> Box<dyn ElementImpl>;
}

/// An opaque reference to a located node.
///
/// A handle is only meaningful inside the interaction context it was obtained
/// in. It remembers that context and the session's context generation so that
/// use after a switch or navigation is detected instead of silently hitting
/// the wrong document.
pub struct ElementHandle {
    inner: Box<dyn ElementImpl>,
    matched_by: LocationStrategy,
    context: InteractionContext,
    generation: u64,
}

impl ElementHandle {
    pub fn new(
        inner: Box<dyn ElementImpl>,
        matched_by: LocationStrategy,
        context: InteractionContext,
        generation: u64,
    ) -> Self {
        Self {
            inner,
            matched_by,
            context,
            generation,
        }
    }

    /// The strategy that produced this handle
    pub fn matched_by(&self) -> &LocationStrategy {
        &self.matched_by
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn describe(&self) -> String {
        self.inner.describe()
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.inner.attribute(name).await
    }

    pub async fn property(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.inner.property(name).await
    }

    pub async fn text(&self) -> Result<String, AutomationError> {
        self.inner.text().await
    }

    pub async fn is_displayed(&self) -> Result<bool, AutomationError> {
        self.inner.is_displayed().await
    }

    pub async fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled().await
    }

    pub async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.inner.scroll_into_view().await
    }

    #[instrument(level = "debug", skip(self), fields(element = %self.describe()))]
    pub async fn click(&self) -> Result<(), AutomationError> {
        self.inner.click().await
    }

    #[instrument(level = "debug", skip(self), fields(element = %self.describe()))]
    pub async fn script_click(&self) -> Result<(), AutomationError> {
        self.inner.script_click().await
    }

    /// Clear the field and type `text` into it
    #[instrument(level = "debug", skip(self, text), fields(element = %self.describe()))]
    pub async fn fill(&self, text: &str) -> Result<(), AutomationError> {
        self.inner.clear().await?;
        self.inner.send_keys(text).await
    }

    pub async fn select_by_label(&self, label: &str) -> Result<(), AutomationError> {
        self.inner.select_by_label(label).await
    }

    pub async fn option_labels(&self) -> Result<Vec<String>, AutomationError> {
        self.inner.option_labels().await
    }

    pub async fn selected_label(&self) -> Result<Option<String>, AutomationError> {
        self.inner.selected_label().await
    }

    /// Find a descendant; the result inherits this handle's context.
    pub async fn descendant(
        &self,
        strategy: &LocationStrategy,
    ) -> Result<Option<ElementHandle>, AutomationError> {
        Ok(self
            .inner
            .find_descendant(strategy)
            .await?
            .map(|inner| ElementHandle {
                inner,
                matched_by: strategy.clone(),
                context: self.context.clone(),
                generation: self.generation,
            }))
    }

    /// Get the underlying implementation as a specific type
    pub(crate) fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

impl Clone for ElementHandle {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
            matched_by: self.matched_by.clone(),
            context: self.context.clone(),
            generation: self.generation,
        }
    }
}

impl Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("element", &self.inner.describe())
            .field("matched_by", &self.matched_by.to_string())
            .field("context", &self.context)
            .field("generation", &self.generation)
            .finish()
    }
}
