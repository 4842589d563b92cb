//! Which punch to record: an explicit instruction, or the time of day.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AutomationError;

/// The two recordable attendance events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCode {
    /// Arrival
    Entry,
    /// Departure
    Exit,
}

impl ActionCode {
    /// Short instruction form accepted on the command line
    pub fn short_label(&self) -> &'static str {
        match self {
            ActionCode::Entry => "check-in",
            ActionCode::Exit => "check-out",
        }
    }

    /// Option text shown by the punch-type selector in the portal
    pub fn ui_label(&self) -> &'static str {
        match self {
            ActionCode::Entry => "Time-In",
            ActionCode::Exit => "Time-Out",
        }
    }

    pub fn human_label(&self) -> &'static str {
        match self {
            ActionCode::Entry => "clock in (arrival)",
            ActionCode::Exit => "clock out (departure)",
        }
    }

    /// Case-insensitive match against the short and the UI form
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [ActionCode::Entry, ActionCode::Exit]
            .into_iter()
            .find(|code| {
                label.eq_ignore_ascii_case(code.short_label())
                    || label.eq_ignore_ascii_case(code.ui_label())
            })
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ui_label())
    }
}

impl FromStr for ActionCode {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionCode::from_label(s).ok_or_else(|| {
            AutomationError::InvalidArgument(format!(
                "Unknown punch type '{s}'. Use check-in, check-out, Time-In or Time-Out"
            ))
        })
    }
}

/// Where a decision came from. Audit only; never drives control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionSource {
    Explicit { instruction: String },
    TimeOfDay { hour: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchDecision {
    pub action: ActionCode,
    pub source: DecisionSource,
}

impl fmt::Display for PunchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            DecisionSource::Explicit { instruction } => {
                write!(f, "{} (explicit: {instruction})", self.action)
            }
            DecisionSource::TimeOfDay { hour } => {
                write!(f, "{} (auto, hour {hour:02})", self.action)
            }
        }
    }
}

/// Map an optional instruction and the local time to an action.
///
/// A recognized instruction wins outright. Otherwise the hour decides:
/// `[8, 12)` is an entry, `[17, 23)` an exit, anything else defaults to entry.
pub fn resolve(explicit: Option<&str>, now: NaiveTime) -> ActionCode {
    decide(explicit, now).action
}

/// Like [`resolve`] but keeps the provenance for logging.
pub fn decide(explicit: Option<&str>, now: NaiveTime) -> PunchDecision {
    if let Some(instruction) = explicit {
        if let Some(action) = ActionCode::from_label(instruction) {
            return PunchDecision {
                action,
                source: DecisionSource::Explicit {
                    instruction: instruction.to_string(),
                },
            };
        }
    }

    let hour = now.hour();
    let action = match hour {
        8..=11 => ActionCode::Entry,
        17..=22 => ActionCode::Exit,
        _ => ActionCode::Entry,
    };
    PunchDecision {
        action,
        source: DecisionSource::TimeOfDay { hour },
    }
}
