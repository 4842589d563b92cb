//! The check-in state machine.
//!
//! `Init → LoggedIn → MenuA → MenuB → StepOpened → FormContext →
//! ActionSelected → Submitted → DialogResolved → Done`, with a failure exit
//! from every non-terminal stage. The session is closed exactly once whatever
//! the outcome.

use crate::action::ActionExecutor;
use crate::config::{Credentials, Settings};
use crate::context::ContextSwitcher;
use crate::dialog::{DialogOutcome, DuplicateActionHandler};
use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::locator::Locator;
use crate::punch::{self, PunchDecision};
use crate::retry::RetryPolicy;
use crate::selector::LocationStrategy;
use crate::session::Session;
use crate::site::SiteProfile;
use chrono::NaiveTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Init,
    LoggedIn,
    MenuA,
    MenuB,
    StepOpened,
    FormContext,
    ActionSelected,
    Submitted,
    DialogResolved,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "Init",
            Stage::LoggedIn => "LoggedIn",
            Stage::MenuA => "MenuA",
            Stage::MenuB => "MenuB",
            Stage::StepOpened => "StepOpened",
            Stage::FormContext => "FormContext",
            Stage::ActionSelected => "ActionSelected",
            Stage::Submitted => "Submitted",
            Stage::DialogResolved => "DialogResolved",
            Stage::Done => "Done",
        };
        f.write_str(s)
    }
}

/// Every wait the flow performs. Tests use [`FlowTimings::immediate`].
#[derive(Debug, Clone)]
pub struct FlowTimings {
    /// Pause after navigation and menu activation
    pub settle: Duration,
    pub post_login: Duration,
    /// Pause before looking for the clock step
    pub pre_step: Duration,
    /// Upper bound for each page-quiescence condition
    pub quiescence_timeout: Duration,
    pub quiescence_poll: Duration,
    /// Pause after entering the form's nested document
    pub frame_settle: Duration,
    /// Random pre-submit delay range; `None` disables it
    pub submit_delay: Option<(Duration, Duration)>,
    pub dialog_timeout: Duration,
    pub main_policy: RetryPolicy,
    pub dialog_policy: RetryPolicy,
    pub dialog_poll: Duration,
    pub dialog_follow_up: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            post_login: Duration::from_secs(3),
            pre_step: Duration::from_secs(2),
            quiescence_timeout: Duration::from_secs(10),
            quiescence_poll: Duration::from_millis(250),
            frame_settle: Duration::from_secs(2),
            submit_delay: Some((Duration::from_secs(1), Duration::from_secs(10))),
            dialog_timeout: Duration::from_secs(5),
            main_policy: RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(15)),
            dialog_policy: RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(3)),
            dialog_poll: Duration::from_millis(500),
            dialog_follow_up: Duration::from_secs(2),
        }
    }
}

impl FlowTimings {
    /// No sleeps, single-shot lookups, no submit delay
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            post_login: Duration::ZERO,
            pre_step: Duration::ZERO,
            quiescence_timeout: Duration::ZERO,
            quiescence_poll: Duration::ZERO,
            frame_settle: Duration::ZERO,
            submit_delay: None,
            dialog_timeout: Duration::ZERO,
            main_policy: RetryPolicy::new(3, Duration::ZERO, Duration::ZERO),
            dialog_policy: RetryPolicy::new(2, Duration::ZERO, Duration::ZERO),
            dialog_poll: Duration::ZERO,
            dialog_follow_up: Duration::ZERO,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            main_policy: defaults
                .main_policy
                .with_per_attempt_timeout(settings.flow_wait()),
            submit_delay: settings
                .submit_delay_enabled
                .then_some((settings.submit_delay_min, settings.submit_delay_max)),
            ..defaults
        }
    }

    pub fn without_submit_delay(mut self) -> Self {
        self.submit_delay = None;
        self
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Done {
        decision: PunchDecision,
        dialog: DialogOutcome,
        /// `false` for dry runs
        submitted: bool,
    },
    Failed {
        stage: Stage,
        error: AutomationError,
    },
}

impl RunOutcome {
    /// `StageFailed` for a failed run, the decision and dialog outcome otherwise.
    pub fn into_result(self) -> Result<(PunchDecision, DialogOutcome), AutomationError> {
        match self {
            RunOutcome::Done {
                decision, dialog, ..
            } => Ok((decision, dialog)),
            RunOutcome::Failed { stage, error } => Err(error.at_stage(stage)),
        }
    }
}

/// What one run did, for the caller to print and turn into an exit status.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Stages reached, in order, starting with `Init`
    pub transitions: Vec<Stage>,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, RunOutcome::Done { .. })
    }

    pub fn last_stage(&self) -> Stage {
        self.transitions.last().copied().unwrap_or(Stage::Init)
    }

    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Done { .. } => 0,
            RunOutcome::Failed { .. } => 1,
        }
    }
}

struct StageLog {
    transitions: Vec<Stage>,
}

impl StageLog {
    fn new() -> Self {
        Self {
            transitions: vec![Stage::Init],
        }
    }

    fn current(&self) -> Stage {
        self.transitions.last().copied().unwrap_or(Stage::Init)
    }

    fn advance(&mut self, to: Stage) {
        info!(from = %self.current(), to = %to, "Stage {} -> {}", self.current(), to);
        self.transitions.push(to);
    }
}

type StageResult<T> = Result<T, (Stage, AutomationError)>;

fn at<T>(stage: Stage, result: Result<T, AutomationError>) -> StageResult<T> {
    result.map_err(|e| (stage, e))
}

/// Source of the local wall-clock time used by the punch decision
pub type Clock = Arc<dyn Fn() -> NaiveTime + Send + Sync>;

/// Drives one check-in run over a session it owns.
pub struct CheckInOrchestrator {
    session: Session,
    site: SiteProfile,
    credentials: Credentials,
    timings: FlowTimings,
    instruction: Option<String>,
    clock: Clock,
    dry_run: bool,
}

impl CheckInOrchestrator {
    pub fn new(session: Session, site: SiteProfile, credentials: Credentials) -> Self {
        Self {
            session,
            site,
            credentials,
            timings: FlowTimings::default(),
            instruction: None,
            clock: Arc::new(|| chrono::Local::now().time()),
            dry_run: false,
        }
    }

    pub fn with_timings(mut self, timings: FlowTimings) -> Self {
        self.timings = timings;
        self
    }

    /// `check-in`, `check-out`, `Time-In` or `Time-Out`; anything else falls
    /// back to the time-of-day rule.
    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Locate the submit control but never activate it.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(self) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("check_in", run_id = %run_id, session = %self.session.id());
        async move {
            let started = Instant::now();
            let mut log = StageLog::new();
            info!(dry_run = self.dry_run, "Starting check-in run");

            let outcome = match self.drive(&mut log).await {
                Ok(outcome) => outcome,
                Err((stage, error)) => {
                    error!(
                        stage = %stage,
                        kind = error.kind(),
                        "Check-in failed at {}: {}", stage, error
                    );
                    RunOutcome::Failed { stage, error }
                }
            };

            if let Err(e) = self.session.close().await {
                warn!("Error while closing the browser session: {}", e);
            }

            let report = RunReport {
                run_id,
                transitions: log.transitions,
                outcome,
                elapsed: started.elapsed(),
            };
            info!(
                last_stage = %report.last_stage(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Check-in run finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, log: &mut StageLog) -> StageResult<RunOutcome> {
        at(Stage::LoggedIn, self.login().await)?;
        log.advance(Stage::LoggedIn);

        at(Stage::MenuA, self.open_menu("menu A", &self.site.menu_a).await)?;
        log.advance(Stage::MenuA);

        at(Stage::MenuB, self.open_menu("menu B", &self.site.menu_b).await)?;
        log.advance(Stage::MenuB);

        at(Stage::StepOpened, self.open_clock_step().await)?;
        log.advance(Stage::StepOpened);

        let frame = at(Stage::FormContext, self.locate_form_frame().await)?;
        let guard = at(
            Stage::FormContext,
            ContextSwitcher::new(&self.session).enter_nested(&frame).await,
        )?;
        let inside = self.work_in_form(log).await;
        // Read a native prompt raised by submit before leaving the frame
        let dialog = match &inside {
            Ok((_, true)) => Some(self.resolve_dialog().await),
            _ => None,
        };
        guard.release().await;
        let (decision, submitted) = inside?;

        let dialog = dialog.unwrap_or_else(|| {
            info!("Nothing was submitted; skipping the dialog check");
            DialogOutcome::NotPresent
        });
        log.advance(Stage::DialogResolved);
        log.advance(Stage::Done);

        Ok(RunOutcome::Done {
            decision,
            dialog,
            submitted,
        })
    }

    fn locator<'a>(&'a self, name: &str, strategies: &[LocationStrategy]) -> Locator<'a> {
        self.session
            .locator(name, strategies.iter().cloned())
            .with_policy(self.timings.main_policy)
    }

    async fn activate_or_block(&self, handle: &ElementHandle, what: &str) -> Result<(), AutomationError> {
        if ActionExecutor::new(&self.session).activate(handle).await {
            Ok(())
        } else {
            Err(AutomationError::InteractionBlocked(format!(
                "{what} could not be activated"
            )))
        }
    }

    async fn login(&self) -> Result<(), AutomationError> {
        self.session.goto(&self.site.login_url).await?;
        pause(self.timings.settle).await;
        self.log_page("Login page").await;

        let username = self
            .locator("username field", &self.site.username_field)
            .locate()
            .await?;
        username.fill(&self.credentials.username).await?;

        let password = self
            .locator("password field", &self.site.password_field)
            .locate()
            .await?;
        password.fill(&self.credentials.password).await?;

        let submit = self
            .locator("login button", &self.site.login_submit)
            .clickable()
            .locate()
            .await?;
        self.activate_or_block(&submit, "login button").await?;
        pause(self.timings.post_login).await;

        self.check_left_login_page().await;
        Ok(())
    }

    /// Advisory only: a URL that still looks like the login page is logged,
    /// the next stage decides whether the run can go on.
    async fn check_left_login_page(&self) {
        match self.session.current_url().await {
            Ok(url) => {
                let lowered = url.to_lowercase();
                if self
                    .site
                    .login_page_markers
                    .iter()
                    .any(|marker| lowered.contains(marker.as_str()))
                {
                    warn!("Still on what looks like the login page: {}", url);
                } else {
                    info!("Login appears successful");
                }
            }
            Err(e) => warn!("Could not read the URL after login: {}", e),
        }
        self.log_page("After login").await;
    }

    async fn log_page(&self, label: &str) {
        let title = self.session.title().await.unwrap_or_default();
        let url = self.session.current_url().await.unwrap_or_default();
        info!(title = %title, url = %url, "{}", label);
    }

    async fn open_menu(&self, name: &str, strategies: &[LocationStrategy]) -> Result<(), AutomationError> {
        let item = self.locator(name, strategies).clickable().locate().await?;
        self.activate_or_block(&item, name).await?;
        pause(self.timings.settle).await;
        Ok(())
    }

    async fn open_clock_step(&self) -> Result<(), AutomationError> {
        ContextSwitcher::new(&self.session).return_to_top().await;
        pause(self.timings.pre_step).await;

        let step = self
            .locator("clock step", &self.site.clock_step)
            .locate()
            .await?;
        let role = step.attribute("role").await.ok().flatten();
        let target = if role.as_deref() == Some("link") {
            step
        } else {
            let link = step.descendant(&self.site.clock_step_link).await;
            match link {
                Ok(Some(link)) => {
                    debug!("Using the step's link descendant");
                    link
                }
                Ok(None) => step,
                Err(e) => {
                    debug!("Descendant lookup failed, using the step itself: {}", e);
                    step
                }
            }
        };

        if !ActionExecutor::new(&self.session).activate(&target).await {
            // The property is the resolved absolute URL; the attribute may be relative
            let href = match target.property("href").await {
                Ok(Some(href)) => Some(href),
                _ => target.attribute("href").await.ok().flatten(),
            }
            .filter(|href| !href.trim().is_empty());
            match href {
                Some(href) => {
                    info!("Step could not be clicked; following its link instead");
                    self.session.goto(&href).await?;
                }
                None => {
                    return Err(AutomationError::InteractionBlocked(
                        "clock step could not be activated and has no link".to_string(),
                    ))
                }
            }
        }
        pause(self.timings.settle).await;
        Ok(())
    }

    async fn locate_form_frame(&self) -> Result<ElementHandle, AutomationError> {
        self.wait_for_condition(
            "background requests to finish",
            "return (typeof jQuery === 'undefined') || jQuery.active === 0;",
        )
        .await;
        self.wait_for_condition(
            "document to be ready",
            "return document.readyState === 'complete';",
        )
        .await;

        self.locator("page body", &self.site.document_body)
            .locate()
            .await?;
        self.locator("clock form frame", &self.site.form_frame)
            .locate()
            .await
    }

    /// Polls `script` until it returns `true`. A timeout is logged and
    /// tolerated.
    async fn wait_for_condition(&self, what: &str, script: &str) -> bool {
        let deadline = Instant::now() + self.timings.quiescence_timeout;
        loop {
            match self.session.execute_script(script).await {
                Ok(serde_json::Value::Bool(true)) => {
                    debug!("Done waiting for {}", what);
                    return true;
                }
                Ok(_) => {}
                Err(e) => debug!("Readiness probe for {} failed: {}", what, e),
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("Timed out waiting for {}; continuing", what);
                return false;
            }
            tokio::time::sleep(self.timings.quiescence_poll.min(deadline - now)).await;
        }
    }

    /// Everything that happens inside the form's nested document. The caller
    /// owns the context guard and releases it whatever this returns.
    async fn work_in_form(&self, log: &mut StageLog) -> StageResult<(PunchDecision, bool)> {
        pause(self.timings.frame_settle).await;
        at(
            Stage::FormContext,
            self.locator("form body", &self.site.document_body)
                .locate()
                .await,
        )?;
        log.advance(Stage::FormContext);

        let decision = punch::decide(self.instruction.as_deref(), (self.clock)());
        info!("Punch decision: {}", decision);
        at(Stage::ActionSelected, self.select_punch_type(&decision).await)?;
        log.advance(Stage::ActionSelected);

        let submitted = at(Stage::Submitted, self.submit().await)?;
        log.advance(Stage::Submitted);

        Ok((decision, submitted))
    }

    async fn select_punch_type(&self, decision: &PunchDecision) -> Result<(), AutomationError> {
        let select = self
            .locator("punch type selector", &self.site.punch_type)
            .locate()
            .await?;
        match select.option_labels().await {
            Ok(labels) => info!("Available punch types: {:?}", labels),
            Err(e) => debug!("Could not list punch types: {}", e),
        }

        select.select_by_label(decision.action.ui_label()).await?;

        match select.selected_label().await {
            Ok(Some(label)) => info!("Selected punch type: {}", label),
            Ok(None) => warn!("Punch type selector reports no selection"),
            Err(e) => debug!("Could not read the selected punch type: {}", e),
        }
        Ok(())
    }

    fn submit_delay(&self) -> Option<Duration> {
        let (min, max) = self.timings.submit_delay?;
        if max <= min {
            return Some(min);
        }
        let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Some(Duration::from_millis(millis))
    }

    /// `Ok(false)` when this is a dry run and nothing was clicked.
    async fn submit(&self) -> Result<bool, AutomationError> {
        if let Some(delay) = self.submit_delay() {
            info!("Waiting {:.1}s before submitting", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }

        let save = self
            .locator("save button", &self.site.save_button)
            .clickable()
            .locate()
            .await?;
        if self.dry_run {
            info!("Dry run: located {} but not submitting", save.describe());
            return Ok(false);
        }
        self.activate_or_block(&save, "save button").await?;
        info!("Punch submitted");
        Ok(true)
    }

    async fn resolve_dialog(&self) -> DialogOutcome {
        let outcome = DuplicateActionHandler::new(&self.session, &self.site.dialog)
            .with_confirm_policy(self.timings.dialog_policy)
            .with_poll_interval(self.timings.dialog_poll)
            .with_follow_up_wait(self.timings.dialog_follow_up)
            .handle(self.timings.dialog_timeout)
            .await;
        if outcome == DialogOutcome::HandleFailed {
            warn!("Confirmation dialog could not be dismissed; the punch itself was submitted");
        }
        outcome
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_variant_names() {
        assert_eq!(Stage::MenuB.to_string(), "MenuB");
        assert_eq!(Stage::DialogResolved.to_string(), "DialogResolved");
    }

    #[test]
    fn test_default_timings_use_fifteen_second_lookups() {
        let timings = FlowTimings::default();
        assert_eq!(timings.main_policy.max_attempts, 3);
        assert_eq!(timings.main_policy.per_attempt_timeout, Duration::from_secs(15));
        assert_eq!(timings.dialog_policy.max_attempts, 2);
    }

    #[test]
    fn test_stage_log_records_transitions_in_order() {
        let mut log = StageLog::new();
        log.advance(Stage::LoggedIn);
        log.advance(Stage::MenuA);
        assert_eq!(log.current(), Stage::MenuA);
        assert_eq!(log.transitions, vec![Stage::Init, Stage::LoggedIn, Stage::MenuA]);
    }
}
