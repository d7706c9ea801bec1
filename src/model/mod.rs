// File: ./src/model/mod.rs
pub mod date;
pub mod event;
pub mod matcher;

pub use date::{ClockTime, DateKey, YearMonth};
pub use event::{Event, EventDraft, EventType, find_overlap};
pub use matcher::Keyword;

use std::collections::BTreeMap;

/// Date-keyed event lists, in chronological key order.
pub type EventMap = BTreeMap<DateKey, Vec<Event>>;
