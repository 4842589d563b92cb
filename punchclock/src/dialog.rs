use crate::action::ActionExecutor;
use crate::context::ContextSwitcher;
use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::retry::RetryPolicy;
use crate::selector::{LocationStrategy, ReadyCondition};
use crate::session::{InteractionContext, Session};
use crate::site::DialogProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Result of one duplicate-check cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogOutcome {
    NotPresent,
    HandledNormal,
    HandledDuplicate,
    HandleFailed,
}

impl fmt::Display for DialogOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialogOutcome::NotPresent => "no dialog",
            DialogOutcome::HandledNormal => "dialog confirmed",
            DialogOutcome::HandledDuplicate => "duplicate-punch dialog confirmed",
            DialogOutcome::HandleFailed => "dialog could not be confirmed",
        };
        f.write_str(s)
    }
}

enum Detected {
    NativeAlert(String),
    Element(ElementHandle),
}

struct Confirmation {
    duplicate: bool,
    confirmed: bool,
}

/// Detects and dismisses the confirmation dialog the portal shows after a
/// submission (most notably when the same punch was already recorded).
///
/// The handler works at top level and hands the context back the way it
/// found it. A native prompt that is already open is
/// accepted before any context switch, since a switch may settle it.
pub struct DuplicateActionHandler<'s> {
    session: &'s Session,
    profile: &'s DialogProfile,
    confirm_policy: RetryPolicy,
    poll_interval: Duration,
    follow_up_wait: Duration,
}

impl<'s> DuplicateActionHandler<'s> {
    pub fn new(session: &'s Session, profile: &'s DialogProfile) -> Self {
        Self {
            session,
            profile,
            confirm_policy: RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(3)),
            poll_interval: Duration::from_millis(500),
            follow_up_wait: Duration::from_secs(2),
        }
    }

    pub fn with_confirm_policy(mut self, policy: RetryPolicy) -> Self {
        self.confirm_policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_follow_up_wait(mut self, wait: Duration) -> Self {
        self.follow_up_wait = wait;
        self
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn handle(&self, timeout: Duration) -> DialogOutcome {
        let entry = self.session.active_context();

        let pending = match self.pending_native_alert().await {
            Some(text) => {
                debug!(context = %entry, "Native prompt already open");
                Some(self.confirm(Detected::NativeAlert(text)).await)
            }
            None => None,
        };

        ContextSwitcher::new(self.session).return_to_top().await;
        let outcome = match pending {
            Some(confirmation) => self.follow_up(confirmation).await,
            None => self.handle_at_top(timeout).await,
        };
        info!(outcome = %outcome, "Duplicate-action check finished");

        self.restore(&entry).await;
        outcome
    }

    async fn handle_at_top(&self, timeout: Duration) -> DialogOutcome {
        let Some(detected) = self.wait_for_dialog(timeout).await else {
            info!("No confirmation dialog appeared within {:?}", timeout);
            return DialogOutcome::NotPresent;
        };
        let confirmation = self.confirm(detected).await;
        self.follow_up(confirmation).await
    }

    async fn pending_native_alert(&self) -> Option<String> {
        if !self.profile.detect_native_alerts {
            return None;
        }
        match self.session.engine().alert_text().await {
            Ok(text) => text,
            Err(e) => {
                debug!("Native alert probe failed: {}", e);
                None
            }
        }
    }

    /// Classify the dialog and dismiss it
    async fn confirm(&self, detected: Detected) -> Confirmation {
        let text = match &detected {
            Detected::NativeAlert(text) => Some(text.clone()),
            Detected::Element(signature) => self.message_text(signature).await,
        };
        let duplicate = text
            .as_deref()
            .map(|t| self.is_duplicate_notice(t))
            .unwrap_or(false);
        match &text {
            Some(text) => info!(duplicate, "Dialog message: {}", text.trim()),
            None => info!(duplicate, "Dialog present but its message could not be read"),
        }

        let confirmed = match detected {
            Detected::NativeAlert(_) => match self.session.engine().accept_alert().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to accept native alert: {}", e);
                    false
                }
            },
            Detected::Element(_) => self.confirm_in_page().await,
        };
        Confirmation {
            duplicate,
            confirmed,
        }
    }

    async fn follow_up(&self, confirmation: Confirmation) -> DialogOutcome {
        if !confirmation.confirmed {
            return DialogOutcome::HandleFailed;
        }

        if !self.follow_up_wait.is_zero() {
            tokio::time::sleep(self.follow_up_wait).await;
        }
        if let Some(second) = self.probe_once().await {
            let text = match &second {
                Detected::NativeAlert(text) => Some(text.clone()),
                Detected::Element(signature) => self.message_text(signature).await,
            };
            info!(
                "A second dialog followed the confirmation: {}",
                text.as_deref().unwrap_or("<unreadable>")
            );
        }

        if confirmation.duplicate {
            DialogOutcome::HandledDuplicate
        } else {
            DialogOutcome::HandledNormal
        }
    }

    /// Whether `text` contains one of the duplicate-punch marker phrases
    pub fn is_duplicate_notice(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.profile
            .duplicate_markers
            .iter()
            .any(|marker| text.contains(&marker.to_lowercase()))
    }

    async fn wait_for_dialog(&self, timeout: Duration) -> Option<Detected> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(detected) = self.probe_once().await {
                return Some(detected);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// One quick look for every known dialog signature
    async fn probe_once(&self) -> Option<Detected> {
        let engine = self.session.engine();
        if self.profile.detect_native_alerts {
            match engine.alert_text().await {
                Ok(Some(text)) => return Some(Detected::NativeAlert(text)),
                Ok(None) => {}
                Err(e) => debug!("Native alert probe failed: {}", e),
            }
        }
        // Probed directly rather than through a Locator: this runs on every
        // poll tick and a miss is the normal case.
        for signature in &self.profile.signatures {
            let context = self.session.active_context();
            let generation = self.session.generation();
            if let Ok(inner) = engine
                .find_element(signature, Duration::ZERO, ReadyCondition::Present)
                .await
            {
                debug!(%signature, "Dialog signature present");
                return Some(Detected::Element(ElementHandle::new(
                    inner,
                    signature.clone(),
                    context,
                    generation,
                )));
            }
        }
        None
    }

    async fn message_text(&self, signature: &ElementHandle) -> Option<String> {
        let located = self
            .session
            .locator("dialog message", self.profile.message.iter().cloned())
            .with_policy(RetryPolicy::once(Duration::ZERO))
            .locate()
            .await;
        let source = located.as_ref().unwrap_or(signature);
        match source.text().await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                debug!("Could not read dialog text: {}", e);
                None
            }
        }
    }

    async fn confirm_in_page(&self) -> bool {
        let control = self
            .session
            .locator("dialog confirmation control", self.profile.confirm.iter().cloned())
            .with_policy(self.confirm_policy)
            .clickable()
            .locate()
            .await;
        match control {
            Ok(control) => ActionExecutor::new(self.session).activate(&control).await,
            Err(e) => {
                warn!("Dialog has no discoverable confirmation control: {}", e);
                false
            }
        }
    }

    async fn restore(&self, entry: &InteractionContext) {
        let InteractionContext::Nested { frame } = entry else {
            return;
        };
        if let Err(e) = self.reenter(frame).await {
            warn!(context = %entry, "Could not restore nested context after dialog check: {}", e);
        }
    }

    async fn reenter(&self, frame: &LocationStrategy) -> Result<(), AutomationError> {
        let handle = self
            .session
            .locator("form frame", [frame.clone()])
            .with_policy(self.confirm_policy)
            .locate()
            .await?;
        ContextSwitcher::new(self.session).switch_into(&handle).await
    }
}
