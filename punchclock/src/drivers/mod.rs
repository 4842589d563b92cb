use crate::element::{ElementHandle, ElementImpl};
use crate::errors::AutomationError;
use crate::selector::{LocationStrategy, ReadyCondition};
use std::sync::Arc;
use std::time::Duration;

pub mod webdriver;

/// Options handed to the driver when a session is created
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Address of a running WebDriver server (e.g. chromedriver)
    pub webdriver_url: String,
    pub headless: bool,
    pub page_load_timeout: Duration,
    /// Extra browser command-line arguments
    pub extra_args: Vec<String>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            page_load_timeout: Duration::from_secs(30),
            extra_args: Vec::new(),
        }
    }
}

/// The narrow session interface the automation core is written against.
///
/// Implementations own the browser connection; callers never see
/// driver-specific types except through [`ElementImpl`].
#[async_trait::async_trait]
pub trait AutomationEngine: Send + Sync {
    /// Navigate the top-level document
    async fn goto(&self, url: &str) -> Result<(), AutomationError>;

    async fn current_url(&self) -> Result<String, AutomationError>;

    async fn title(&self) -> Result<String, AutomationError>;

    /// Find the first element matching `strategy` in the active document,
    /// polling up to `timeout` for `condition` to hold. A zero timeout makes
    /// a single probe. Returns `ElementNotFound` or `Timeout` when nothing
    /// qualifies in time.
    async fn find_element(
        &self,
        strategy: &LocationStrategy,
        timeout: Duration,
        condition: ReadyCondition,
    ) -> Result<Box<dyn ElementImpl>, AutomationError>;

    /// Make the document inside `frame` the active one
    async fn enter_frame(&self, frame: &ElementHandle) -> Result<(), AutomationError>;

    /// Make the top-level document the active one
    async fn enter_top_level(&self) -> Result<(), AutomationError>;

    /// Evaluate a script in the active document and return its JSON result
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, AutomationError>;

    /// Text of a pending native alert/confirm, if one is open
    async fn alert_text(&self) -> Result<Option<String>, AutomationError>;

    async fn accept_alert(&self) -> Result<(), AutomationError>;

    /// End the browser session
    async fn quit(&self) -> Result<(), AutomationError>;

    /// Enable downcasting to concrete engine types
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Connect to the configured WebDriver server and start a fresh session
pub async fn create_engine(
    options: &DriverOptions,
) -> Result<Arc<dyn AutomationEngine>, AutomationError> {
    Ok(Arc::new(webdriver::WebDriverEngine::connect(options).await?))
}
