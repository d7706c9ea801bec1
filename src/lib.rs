// Crate root library declaration and module exports.
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;

pub use error::{StoreError, StoreResult, ValidationError};
pub use model::{ClockTime, DateKey, Event, EventDraft, EventMap, EventType, YearMonth};
pub use store::EventStore;
