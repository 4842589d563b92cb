//! W3C WebDriver engine backed by `fantoccini` (talks to chromedriver).

use super::{AutomationEngine, DriverOptions};
use crate::element::{ElementHandle, ElementImpl};
use crate::errors::AutomationError;
use crate::selector::{LocationStrategy, Query, ReadyCondition};
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct WebDriverEngine {
    client: Client,
}

impl WebDriverEngine {
    pub async fn connect(options: &DriverOptions) -> Result<Self, AutomationError> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];
        if options.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(options.extra_args.iter().cloned());

        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": args,
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }),
        );
        // Leave native prompts open across other commands; the dialog
        // handler reads and accepts them itself.
        caps.insert("unhandledPromptBehavior".to_string(), json!("ignore"));

        info!(
            url = %options.webdriver_url,
            headless = options.headless,
            "Connecting to WebDriver"
        );
        let client = ClientBuilder::rustls()
            .map_err(|e| AutomationError::PlatformError(format!("TLS setup failed: {e}")))?
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await?;

        // Explicit polling only: an implicit wait would stretch every miss.
        client
            .update_timeouts(TimeoutConfiguration::new(
                None,
                Some(options.page_load_timeout),
                Some(Duration::ZERO),
            ))
            .await?;

        info!("WebDriver session started");
        Ok(Self { client })
    }

    async fn find_once(&self, query: &Query) -> Result<Option<Element>, AutomationError> {
        match self.client.find(to_locator(query)).await {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_clickable(element: &Element) -> bool {
        matches!(element.is_displayed().await, Ok(true))
            && matches!(element.is_enabled().await, Ok(true))
    }
}

fn to_locator(query: &Query) -> Locator<'_> {
    match query {
        Query::Css(css) => Locator::Css(css),
        Query::XPath(xpath) => Locator::XPath(xpath),
    }
}

/// Classify a failed standard click so callers can tell "blocked" apart from
/// transport failures.
fn classify_click_error(e: CmdError) -> AutomationError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("stale element") {
        AutomationError::StaleElement(message)
    } else if lower.contains("intercepted")
        || lower.contains("not interactable")
        || lower.contains("obscure")
    {
        AutomationError::InteractionBlocked(message)
    } else {
        AutomationError::PlatformError(message)
    }
}

#[async_trait::async_trait]
impl AutomationEngine for WebDriverEngine {
    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn title(&self) -> Result<String, AutomationError> {
        Ok(self.client.title().await?)
    }

    async fn find_element(
        &self,
        strategy: &LocationStrategy,
        timeout: Duration,
        condition: ReadyCondition,
    ) -> Result<Box<dyn ElementImpl>, AutomationError> {
        let query = strategy
            .to_query()
            .ok_or_else(|| AutomationError::InvalidSelector(strategy.to_string()))?;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(element) = self.find_once(&query).await? {
                if condition == ReadyCondition::Present || Self::is_clickable(&element).await {
                    return Ok(Box::new(WebDriverElement {
                        client: self.client.clone(),
                        element,
                        description: strategy.to_string(),
                    }));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "Timed out after {timeout:?} waiting for {strategy} to be {condition:?}"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn enter_frame(&self, frame: &ElementHandle) -> Result<(), AutomationError> {
        let frame = frame
            .as_any()
            .downcast_ref::<WebDriverElement>()
            .ok_or_else(|| {
                AutomationError::ContextError(
                    "Frame handle does not belong to a WebDriver session".to_string(),
                )
            })?;
        frame
            .element
            .clone()
            .enter_frame()
            .await
            .map_err(|e| AutomationError::ContextError(e.to_string()))?;
        Ok(())
    }

    async fn enter_top_level(&self) -> Result<(), AutomationError> {
        self.client
            .enter_frame(None)
            .await
            .map_err(|e| AutomationError::ContextError(e.to_string()))?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, AutomationError> {
        Ok(self.client.execute(script, vec![]).await?)
    }

    async fn alert_text(&self) -> Result<Option<String>, AutomationError> {
        match self.client.get_alert_text().await {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                debug!("No native alert open: {}", e);
                Ok(None)
            }
        }
    }

    async fn accept_alert(&self) -> Result<(), AutomationError> {
        self.client.accept_alert().await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        if let Err(e) = self.client.clone().close().await {
            warn!("Failed to end WebDriver session cleanly: {}", e);
            return Err(e.into());
        }
        info!("Browser closed");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Clone)]
pub struct WebDriverElement {
    client: Client,
    element: Element,
    description: String,
}

impl std::fmt::Debug for WebDriverElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverElement")
            .field("description", &self.description)
            .finish()
    }
}

impl WebDriverElement {
    async fn run_on_self(&self, script: &str) -> Result<serde_json::Value, AutomationError> {
        let arg = serde_json::to_value(&self.element)
            .map_err(|e| AutomationError::Internal(format!("Failed to serialize element: {e}")))?;
        Ok(self.client.execute(script, vec![arg]).await?)
    }
}

#[async_trait::async_trait]
impl ElementImpl for WebDriverElement {
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        Ok(self.element.attr(name).await?)
    }

    async fn property(&self, name: &str) -> Result<Option<String>, AutomationError> {
        Ok(self.element.prop(name).await?)
    }

    async fn text(&self) -> Result<String, AutomationError> {
        Ok(self.element.text().await?)
    }

    async fn is_displayed(&self) -> Result<bool, AutomationError> {
        Ok(self.element.is_displayed().await?)
    }

    async fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.element.is_enabled().await?)
    }

    async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.run_on_self("arguments[0].scrollIntoView({block: 'center'});")
            .await?;
        Ok(())
    }

    async fn click(&self) -> Result<(), AutomationError> {
        self.element.click().await.map_err(classify_click_error)?;
        Ok(())
    }

    async fn script_click(&self) -> Result<(), AutomationError> {
        self.run_on_self("arguments[0].click();").await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AutomationError> {
        self.element.clear().await?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.element.send_keys(text).await?;
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> Result<(), AutomationError> {
        self.element.select_by_label(label).await?;
        Ok(())
    }

    async fn option_labels(&self) -> Result<Vec<String>, AutomationError> {
        let mut labels = Vec::new();
        for option in self.element.find_all(Locator::Css("option")).await? {
            let text = option.text().await?;
            if !text.trim().is_empty() {
                labels.push(text);
            }
        }
        Ok(labels)
    }

    async fn selected_label(&self) -> Result<Option<String>, AutomationError> {
        match self.element.find(Locator::Css("option:checked")).await {
            Ok(option) => Ok(Some(option.text().await?)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_descendant(
        &self,
        strategy: &LocationStrategy,
    ) -> Result<Option<Box<dyn ElementImpl>>, AutomationError> {
        let query = strategy
            .to_query()
            .ok_or_else(|| AutomationError::InvalidSelector(strategy.to_string()))?;
        match self.element.find(to_locator(&query)).await {
            Ok(element) => Ok(Some(Box::new(WebDriverElement {
                client: self.client.clone(),
                element,
                description: format!("{} >> {}", self.description, strategy),
            }))),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ElementImpl> {
        Box::new(self.clone())
    }
}
