//! In-memory engine that models a portal as static documents.
//!
//! Each document (the top level, plus one per frame strategy) maps a
//! location strategy to a node. Lookups match strategies exactly; clicking a
//! node can reveal or remove nodes in the top-level document, which is how
//! confirmation dialogs appear and go away.

use crate::drivers::AutomationEngine;
use crate::element::{ElementHandle, ElementImpl};
use crate::errors::AutomationError;
use crate::selector::{LocationStrategy, ReadyCondition};
use crate::site::SiteProfile;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type DocKey = Option<LocationStrategy>;

#[derive(Debug, Clone)]
pub struct MockNode {
    pub attrs: HashMap<String, String>,
    /// DOM properties; lookups fall back to `attrs`
    pub props: HashMap<String, String>,
    pub text: String,
    pub displayed: bool,
    pub enabled: bool,
    pub click_fails: bool,
    pub script_click_fails: bool,
    pub options: Vec<String>,
    pub descendants: HashMap<LocationStrategy, MockNode>,
    /// Inserted into the top-level document on activation
    pub reveals: Vec<(LocationStrategy, MockNode)>,
    /// Removed from the top-level document on activation
    pub dismisses: Vec<LocationStrategy>,
    /// Opens a native prompt with this text on activation
    pub raises_alert: Option<String>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            attrs: HashMap::new(),
            props: HashMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            click_fails: false,
            script_click_fails: false,
            options: Vec::new(),
            descendants: HashMap::new(),
            reveals: Vec::new(),
            dismisses: Vec::new(),
            raises_alert: None,
        }
    }
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn prop(mut self, name: &str, value: &str) -> Self {
        self.props.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn click_fails(mut self) -> Self {
        self.click_fails = true;
        self
    }

    pub fn unclickable(mut self) -> Self {
        self.click_fails = true;
        self.script_click_fails = true;
        self
    }

    pub fn options(mut self, labels: &[&str]) -> Self {
        self.options = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn descendant(mut self, strategy: LocationStrategy, node: MockNode) -> Self {
        self.descendants.insert(strategy, node);
        self
    }

    pub fn reveals(mut self, strategy: LocationStrategy, node: MockNode) -> Self {
        self.reveals.push((strategy, node));
        self
    }

    pub fn dismisses(mut self, strategy: LocationStrategy) -> Self {
        self.dismisses.push(strategy);
        self
    }

    pub fn raises_alert(mut self, text: &str) -> Self {
        self.raises_alert = Some(text.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    docs: HashMap<DocKey, HashMap<LocationStrategy, MockNode>>,
    current: DocKey,
    url: String,
    title: String,
    alert: Option<String>,
    /// Switching documents settles any open prompt by dismissing it
    switch_dismisses_alert: bool,
    pub find_log: Vec<LocationStrategy>,
    pub clicks: Vec<String>,
    pub script_clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub selected: HashMap<String, String>,
    pub frame_switches: Vec<String>,
    pub visited: Vec<String>,
    pub alerts_accepted: u32,
    pub alerts_dismissed: u32,
    pub quit_calls: u32,
}

impl MockState {
    fn apply_effects(&mut self, node: &MockNode) {
        let top = self.docs.entry(None).or_default();
        for (strategy, revealed) in &node.reveals {
            top.insert(strategy.clone(), revealed.clone());
        }
        for strategy in &node.dismisses {
            top.remove(strategy);
        }
        if let Some(text) = &node.raises_alert {
            self.alert = Some(text.clone());
        }
    }

    fn settle_alert_on_switch(&mut self) {
        if self.switch_dismisses_alert && self.alert.take().is_some() {
            self.alerts_dismissed += 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        {
            let mut state = engine.state();
            state.url = "about:blank".to_string();
            state.docs.insert(None, HashMap::new());
        }
        engine
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn add(&self, strategy: LocationStrategy, node: MockNode) -> &Self {
        self.state()
            .docs
            .entry(None)
            .or_default()
            .insert(strategy, node);
        self
    }

    /// Adds `node` to the document inside the frame located by `frame`.
    pub fn add_in_frame(
        &self,
        frame: &LocationStrategy,
        strategy: LocationStrategy,
        node: MockNode,
    ) -> &Self {
        self.state()
            .docs
            .entry(Some(frame.clone()))
            .or_default()
            .insert(strategy, node);
        self
    }

    pub fn remove(&self, strategy: &LocationStrategy) -> &Self {
        for doc in self.state().docs.values_mut() {
            doc.remove(strategy);
        }
        self
    }

    pub fn set_alert(&self, text: &str) -> &Self {
        self.state().alert = Some(text.to_string());
        self
    }

    /// Model a driver that dismisses open prompts on the next frame switch
    pub fn dismiss_alerts_on_switch(&self) -> &Self {
        self.state().switch_dismisses_alert = true;
        self
    }

    pub fn in_frame(&self) -> bool {
        self.state().current.is_some()
    }

    /// A portal where the full check-in flow succeeds using the first
    /// strategy of every candidate list. Saving shows a duplicate-punch
    /// dialog that the OK button dismisses.
    pub fn portal(site: &SiteProfile) -> Self {
        let engine = Self::new();
        let frame = &site.form_frame[0];
        let body = site.document_body[0].clone();

        engine
            .add(site.username_field[0].clone(), MockNode::new())
            .add(site.password_field[0].clone(), MockNode::new())
            .add(site.login_submit[0].clone(), MockNode::new())
            .add(site.menu_a[0].clone(), MockNode::new())
            .add(site.menu_b[0].clone(), MockNode::new())
            .add(
                site.clock_step[0].clone(),
                MockNode::new().attr("role", "link"),
            )
            .add(body.clone(), MockNode::new())
            .add(frame.clone(), MockNode::new().attr("src", "/TL_WEB_CLOCK.GBL"))
            .add_in_frame(frame, body, MockNode::new())
            .add_in_frame(
                frame,
                site.punch_type[0].clone(),
                MockNode::new().options(&["", "Time-In", "Time-Out"]),
            )
            .add_in_frame(
                frame,
                site.save_button[0].clone(),
                MockNode::new()
                    .reveals(
                        LocationStrategy::id("alertmsg"),
                        MockNode::new().text("You have already punched for this period"),
                    )
                    .reveals(
                        site.dialog.confirm[0].clone(),
                        MockNode::new()
                            .dismisses(LocationStrategy::id("alertmsg"))
                            .dismisses(site.dialog.confirm[0].clone()),
                    ),
            );
        engine
    }
}

#[async_trait::async_trait]
impl AutomationEngine for MockEngine {
    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        let mut state = self.state();
        state.visited.push(url.to_string());
        state.url = url.to_string();
        state.current = None;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> Result<String, AutomationError> {
        Ok(self.state().title.clone())
    }

    async fn find_element(
        &self,
        strategy: &LocationStrategy,
        _timeout: Duration,
        condition: ReadyCondition,
    ) -> Result<Box<dyn ElementImpl>, AutomationError> {
        let mut state = self.state();
        state.find_log.push(strategy.clone());
        let doc = state.current.clone();
        let node = state
            .docs
            .get(&doc)
            .and_then(|nodes| nodes.get(strategy))
            .cloned();
        match node {
            Some(node)
                if condition == ReadyCondition::Present || (node.displayed && node.enabled) =>
            {
                Ok(Box::new(MockElement {
                    state: self.state.clone(),
                    key: strategy.clone(),
                    node,
                }))
            }
            Some(_) => Err(AutomationError::Timeout(format!("{strategy} never became clickable"))),
            None => Err(AutomationError::ElementNotFound {
                element: strategy.to_string(),
                attempts: 1,
            }),
        }
    }

    async fn enter_frame(&self, frame: &ElementHandle) -> Result<(), AutomationError> {
        let mut state = self.state();
        let key = Some(frame.matched_by().clone());
        if !state.docs.contains_key(&key) {
            return Err(AutomationError::ContextError(format!(
                "{} hosts no document",
                frame.describe()
            )));
        }
        state.settle_alert_on_switch();
        state.frame_switches.push(format!("frame:{}", frame.matched_by()));
        state.current = key;
        Ok(())
    }

    async fn enter_top_level(&self) -> Result<(), AutomationError> {
        let mut state = self.state();
        state.settle_alert_on_switch();
        state.frame_switches.push("top".to_string());
        state.current = None;
        Ok(())
    }

    async fn execute_script(&self, _script: &str) -> Result<serde_json::Value, AutomationError> {
        Ok(serde_json::Value::Bool(true))
    }

    async fn alert_text(&self) -> Result<Option<String>, AutomationError> {
        Ok(self.state().alert.clone())
    }

    async fn accept_alert(&self) -> Result<(), AutomationError> {
        let mut state = self.state();
        match state.alert.take() {
            Some(_) => {
                state.alerts_accepted += 1;
                Ok(())
            }
            None => Err(AutomationError::PlatformError("no alert open".to_string())),
        }
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        self.state().quit_calls += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct MockElement {
    state: Arc<Mutex<MockState>>,
    key: LocationStrategy,
    node: MockNode,
}

impl MockElement {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ElementImpl for MockElement {
    fn describe(&self) -> String {
        self.key.to_string()
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        Ok(self.node.attrs.get(name).cloned())
    }

    async fn property(&self, name: &str) -> Result<Option<String>, AutomationError> {
        Ok(self
            .node
            .props
            .get(name)
            .or_else(|| self.node.attrs.get(name))
            .cloned())
    }

    async fn text(&self) -> Result<String, AutomationError> {
        Ok(self.node.text.clone())
    }

    async fn is_displayed(&self) -> Result<bool, AutomationError> {
        Ok(self.node.displayed)
    }

    async fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.node.enabled)
    }

    async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn click(&self) -> Result<(), AutomationError> {
        let mut state = self.state();
        state.clicks.push(self.key.to_string());
        if self.node.click_fails {
            return Err(AutomationError::InteractionBlocked(
                "element click intercepted".to_string(),
            ));
        }
        state.apply_effects(&self.node);
        Ok(())
    }

    async fn script_click(&self) -> Result<(), AutomationError> {
        let mut state = self.state();
        state.script_clicks.push(self.key.to_string());
        if self.node.script_click_fails {
            return Err(AutomationError::PlatformError(
                "script click had no effect".to_string(),
            ));
        }
        state.apply_effects(&self.node);
        Ok(())
    }

    async fn clear(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.state()
            .typed
            .push((self.key.to_string(), text.to_string()));
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> Result<(), AutomationError> {
        if !self.node.options.iter().any(|o| o == label) {
            return Err(AutomationError::ElementNotFound {
                element: format!("option '{label}'"),
                attempts: 1,
            });
        }
        self.state()
            .selected
            .insert(self.key.to_string(), label.to_string());
        Ok(())
    }

    async fn option_labels(&self) -> Result<Vec<String>, AutomationError> {
        Ok(self.node.options.clone())
    }

    async fn selected_label(&self) -> Result<Option<String>, AutomationError> {
        Ok(self.state().selected.get(&self.key.to_string()).cloned())
    }

    async fn find_descendant(
        &self,
        strategy: &LocationStrategy,
    ) -> Result<Option<Box<dyn ElementImpl>>, AutomationError> {
        Ok(self.node.descendants.get(strategy).map(|node| {
            Box::new(MockElement {
                state: self.state.clone(),
                key: strategy.clone(),
                node: node.clone(),
            }) as Box<dyn ElementImpl>
        }))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ElementImpl> {
        Box::new(self.clone())
    }
}
