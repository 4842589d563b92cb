use tracing::{debug, info, instrument, warn};

use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::retry::RetryPolicy;
use crate::selector::{LocationStrategy, ReadyCondition};
use crate::session::Session;

/// Finds one logical element through an ordered list of candidate strategies.
///
/// Each attempt walks the whole list, giving every strategy up to
/// `per_attempt_timeout` to satisfy the ready condition. The first match wins.
/// When a full pass fails and attempts remain, the locator sleeps for the
/// policy's backoff and starts over.
///
/// Exhaustion is reported as [`AutomationError::ElementNotFound`], which the
/// caller is expected to handle; transient driver errors on a single strategy
/// are absorbed and logged.
#[derive(Clone)]
pub struct Locator<'s> {
    session: &'s Session,
    name: String,
    strategies: Vec<LocationStrategy>,
    policy: RetryPolicy,
    condition: ReadyCondition,
}

impl<'s> Locator<'s> {
    pub fn new(
        session: &'s Session,
        name: impl Into<String>,
        strategies: impl IntoIterator<Item = LocationStrategy>,
    ) -> Self {
        Self {
            session,
            name: name.into(),
            strategies: strategies.into_iter().collect(),
            policy: RetryPolicy::default(),
            condition: ReadyCondition::Present,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_condition(mut self, condition: ReadyCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Shorthand for `with_condition(ReadyCondition::Clickable)`
    pub fn clickable(self) -> Self {
        self.with_condition(ReadyCondition::Clickable)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategies(&self) -> &[LocationStrategy] {
        &self.strategies
    }

    #[instrument(level = "debug", skip(self), fields(element = %self.name))]
    pub async fn locate(&self) -> Result<ElementHandle, AutomationError> {
        if self.strategies.is_empty() {
            return Err(AutomationError::InvalidArgument(format!(
                "No location strategies given for {}",
                self.name
            )));
        }
        self.session.ensure_open()?;

        let max_attempts = self.policy.max_attempts.max(1);
        let engine = self.session.engine();

        for attempt in 1..=max_attempts {
            info!(
                attempt,
                max_attempts,
                element = %self.name,
                "Attempt {}/{} to find {}", attempt, max_attempts, self.name
            );

            for strategy in &self.strategies {
                if !strategy.is_valid() {
                    warn!(element = %self.name, %strategy, "Skipping invalid strategy");
                    continue;
                }
                debug!(element = %self.name, %strategy, "Trying strategy");

                // Capture the context before the lookup so the handle is stamped
                // with the document it was actually found in.
                let context = self.session.active_context();
                let generation = self.session.generation();

                match engine
                    .find_element(strategy, self.policy.per_attempt_timeout, self.condition)
                    .await
                {
                    Ok(inner) => {
                        info!(element = %self.name, %strategy, "Found {} using {}", self.name, strategy);
                        return Ok(ElementHandle::new(
                            inner,
                            strategy.clone(),
                            context,
                            generation,
                        ));
                    }
                    Err(e) => {
                        warn!(element = %self.name, %strategy, "Failed {} with {}: {}", self.name, strategy, e);
                    }
                }
            }

            if self.policy.should_back_off(attempt) {
                info!(
                    "Retrying to find {} after {} failed attempt(s)...",
                    self.name, attempt
                );
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        Err(AutomationError::ElementNotFound {
            element: self.name.clone(),
            attempts: max_attempts,
        })
    }
}

impl std::fmt::Debug for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("name", &self.name)
            .field("strategies", &self.strategies)
            .field("policy", &self.policy)
            .field("condition", &self.condition)
            .finish()
    }
}
