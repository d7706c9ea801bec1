// File: src/store.rs
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{StoreError, StoreResult};
use crate::export::{self, ExportFormat};
use crate::model::{DateKey, Event, EventDraft, EventMap, Keyword, YearMonth, find_overlap};
use crate::storage::{EventPersistence, LocalStorage};
use std::path::PathBuf;

/// Owns the date -> events mapping and keeps it mirrored to persistence.
///
/// Invariants held after every operation:
/// - events of one day never overlap (half-open `[start, end)` intervals);
/// - a date present in the map has at least one event.
#[derive(Debug)]
pub struct EventStore {
    events: EventMap,
    persistence: Box<dyn EventPersistence>,
}

impl EventStore {
    /// Loads the persisted mapping. Missing or unreadable data opens an empty store.
    ///
    /// Loaded days are held to the same rules as mutations: events whose
    /// start is not before their end, or that overlap an earlier event of the
    /// same day, are dropped with a warning. Days left empty are removed.
    pub fn open(persistence: Box<dyn EventPersistence>) -> Self {
        let loaded = match persistence.load() {
            Ok(events) => events,
            Err(e) => {
                log::warn!("Could not load events, starting empty: {:#}", e);
                EventMap::new()
            }
        };
        let events: EventMap = loaded
            .into_iter()
            .filter_map(|(date, day)| {
                let day = Self::admit_loaded(date, day);
                (!day.is_empty()).then_some((date, day))
            })
            .collect();
        log::debug!("Opened event store with {} dates", events.len());
        Self { events, persistence }
    }

    /// Keeps the events of a loaded day that a mutation would have accepted,
    /// in stored order.
    fn admit_loaded(date: DateKey, day: Vec<Event>) -> Vec<Event> {
        let mut kept: Vec<Event> = Vec::with_capacity(day.len());
        for event in day {
            if event.start_time >= event.end_time {
                log::warn!(
                    "Dropping '{}' on {}: start is not before end ({})",
                    event.name,
                    date,
                    event.time_range()
                );
                continue;
            }
            if let Some(index) = find_overlap(&kept, &event, None) {
                log::warn!(
                    "Dropping '{}' ({}) on {}: overlaps '{}'",
                    event.name,
                    event.time_range(),
                    date,
                    kept[index].name
                );
                continue;
            }
            kept.push(event);
        }
        kept
    }

    /// Opens the JSON file store configured for `ctx`.
    pub fn open_local(ctx: &dyn AppContext, config: &Config) -> anyhow::Result<Self> {
        let storage = LocalStorage::from_context(ctx, config)?;
        log::info!("Using event data at {:?}", storage.path());
        Ok(Self::open(Box::new(storage)))
    }

    pub fn events(&self) -> &EventMap {
        &self.events
    }

    pub fn events_on(&self, date: &DateKey) -> &[Event] {
        self.events.get(date).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_events(&self, date: &DateKey) -> bool {
        self.events.contains_key(date)
    }

    /// Day numbers of `month` that carry at least one event.
    pub fn marked_days(&self, month: YearMonth) -> Vec<u32> {
        self.month_keys(month)
            .map(|key| chrono::Datelike::day(&key.date()))
            .collect()
    }

    fn month_keys(&self, month: YearMonth) -> impl Iterator<Item = DateKey> + '_ {
        let first = DateKey::new(month.first_day());
        let next = DateKey::new(month.next().first_day());
        self.events.range(first..next).map(|(key, _)| *key)
    }

    // --- Mutations ---

    /// Appends a validated event to `date`.
    pub fn add(&mut self, date: DateKey, draft: EventDraft) -> StoreResult<()> {
        let event = draft.validate()?;
        let day = self.events_on(&date);
        Self::check_overlap(date, day, &event, None)?;

        log::debug!("Adding '{}' ({}) on {}", event.name, event.time_range(), date);
        self.commit(date, |day| day.push(event))
    }

    /// Replaces the event at `index` on `date`. The replaced event is
    /// excluded from the overlap scan.
    pub fn edit(&mut self, date: DateKey, index: usize, draft: EventDraft) -> StoreResult<()> {
        let event = draft.validate()?;
        let day = self.events_on(&date);
        if index >= day.len() {
            return Err(StoreError::NotFound { date, index });
        }
        Self::check_overlap(date, day, &event, Some(index))?;

        log::debug!("Editing #{} on {}: '{}' ({})", index, date, event.name, event.time_range());
        self.commit(date, |day| day[index] = event)
    }

    /// Removes the event at `index` on `date`, dropping the date when it empties.
    pub fn delete(&mut self, date: DateKey, index: usize) -> StoreResult<Event> {
        let removed = self
            .events_on(&date)
            .get(index)
            .cloned()
            .ok_or(StoreError::NotFound { date, index })?;

        log::debug!("Deleting #{} on {}: '{}'", index, date, removed.name);
        self.commit(date, |day| {
            day.remove(index);
        })?;
        Ok(removed)
    }

    fn check_overlap(
        date: DateKey,
        day: &[Event],
        event: &Event,
        skip: Option<usize>,
    ) -> StoreResult<()> {
        match find_overlap(day, event, skip) {
            Some(index) => Err(StoreError::Overlap {
                date,
                index,
                name: day[index].name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Applies `change` to the day's list and persists the whole map.
    /// On a failed save the day is restored, so memory matches storage.
    fn commit<F>(&mut self, date: DateKey, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Vec<Event>),
    {
        let previous = self.events.get(&date).cloned();

        let day = self.events.entry(date).or_default();
        change(day);
        if day.is_empty() {
            self.events.remove(&date);
        }

        if let Err(e) = self.persistence.save(&self.events) {
            log::error!("Failed to persist events, reverting {}: {:#}", date, e);
            match previous {
                Some(day) => {
                    self.events.insert(date, day);
                }
                None => {
                    self.events.remove(&date);
                }
            }
            return Err(StoreError::Persistence(e));
        }
        Ok(())
    }

    // --- Queries ---

    /// Events of `date` matching `keyword` (case-insensitive substring of
    /// name, description or type), in stored order.
    pub fn filter(&self, date: &DateKey, keyword: &str) -> Vec<&Event> {
        self.search(date, keyword)
            .into_iter()
            .map(|(_, event)| event)
            .collect()
    }

    /// Like [`EventStore::filter`], keeping each event's index within the day
    /// so callers can edit or delete from a filtered list.
    pub fn search(&self, date: &DateKey, keyword: &str) -> Vec<(usize, &Event)> {
        let keyword = Keyword::new(keyword);
        self.events_on(date)
            .iter()
            .enumerate()
            .filter(|(_, event)| keyword.matches(event))
            .collect()
    }

    /// Copies out every date accepted by `predicate`.
    pub fn export_range<P>(&self, predicate: P) -> EventMap
    where
        P: Fn(&DateKey) -> bool,
    {
        self.events
            .iter()
            .filter(|(key, _)| predicate(*key))
            .map(|(key, day)| (*key, day.clone()))
            .collect()
    }

    /// The slice of one calendar month, as exported by the month view.
    pub fn month_events(&self, month: YearMonth) -> EventMap {
        self.export_range(|key| month.contains(key))
    }

    /// Writes `month` as an export file into the configured export directory.
    pub fn export_month(
        &self,
        ctx: &dyn AppContext,
        config: &Config,
        month: YearMonth,
        format: ExportFormat,
    ) -> anyhow::Result<PathBuf> {
        let dir = config.resolve_export_dir(ctx)?;
        export::write_export(&dir, &self.month_events(month), month, format)
    }
}
