// File: ./src/model/event.rs
use crate::error::ValidationError;
use crate::model::date::ClockTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(from = "String", into = "&'static str")]
#[strum(ascii_case_insensitive)]
pub enum EventType {
    Work,
    Personal,
    #[default]
    Other,
}

// Older data files may hold an empty or unknown type; those read as Other.
impl From<String> for EventType {
    fn from(s: String) -> Self {
        s.trim().parse().unwrap_or_default()
    }
}

/// A stored calendar event. Only produced by validating an [`EventDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub name: String,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
}

impl Event {
    /// Half-open interval intersection: `[s1,e1)` and `[s2,e2)` overlap iff
    /// `s1 < e2 && s2 < e1`. Touching intervals do not overlap.
    pub fn overlaps(&self, other: &Event) -> bool {
        self.start_time < other.end_time && self.end_time > other.start_time
    }

    pub fn time_range(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

/// Returns the index of the first event in `day` that overlaps `candidate`,
/// ignoring the event at `skip` (the one being edited).
pub fn find_overlap(day: &[Event], candidate: &Event, skip: Option<usize>) -> Option<usize> {
    day.iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != skip)
        .find(|(_, existing)| candidate.overlaps(existing))
        .map(|(idx, _)| idx)
}

/// Form-shaped input for creating or replacing an event.
///
/// Fields hold what the user typed; nothing is trusted until [`EventDraft::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDraft {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
    pub event_type: Option<EventType>,
}

impl EventDraft {
    pub fn new(name: &str, start_time: &str, end_time: &str, event_type: EventType) -> Self {
        Self {
            name: name.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            description: String::new(),
            event_type: Some(event_type),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn validate(&self) -> Result<Event, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.start_time.trim().is_empty() {
            return Err(ValidationError::MissingStartTime);
        }
        if self.end_time.trim().is_empty() {
            return Err(ValidationError::MissingEndTime);
        }

        let start_time = ClockTime::parse(&self.start_time)
            .ok_or_else(|| ValidationError::InvalidTime(self.start_time.clone()))?;
        let end_time = ClockTime::parse(&self.end_time)
            .ok_or_else(|| ValidationError::InvalidTime(self.end_time.clone()))?;

        if start_time >= end_time {
            return Err(ValidationError::StartNotBeforeEnd);
        }

        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Event {
            name: name.to_string(),
            start_time,
            end_time,
            description,
            event_type: self.event_type.unwrap_or_default(),
        })
    }
}

impl From<&Event> for EventDraft {
    fn from(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            start_time: event.start_time.to_string(),
            end_time: event.end_time.to_string(),
            description: event.description.clone().unwrap_or_default(),
            event_type: Some(event.event_type),
        }
    }
}
