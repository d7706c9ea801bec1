// Export of event slices to JSON and CSV files.
use crate::model::{EventMap, YearMonth};
use crate::storage::{self, LocalStorage};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter};

pub const CSV_HEADER: &str = "Date,Name,Start Time,End Time,Description,Type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// `events-<month>-<year>.<ext>`, month 1-based and unpadded.
    pub fn file_name(&self, month: YearMonth) -> String {
        format!(
            "events-{}-{}.{}",
            month.month,
            month.year,
            self.extension()
        )
    }

    pub fn render(&self, events: &EventMap) -> Result<String> {
        match self {
            ExportFormat::Json => to_json(events),
            ExportFormat::Csv => Ok(to_csv(events)),
        }
    }
}

/// Pretty-printed JSON object keyed by ISO date.
pub fn to_json(events: &EventMap) -> Result<String> {
    Ok(serde_json::to_string_pretty(events)?)
}

pub fn from_json(json: &str) -> Result<EventMap> {
    storage::parse_events(json).context("Invalid event export")
}

/// One row per event under [`CSV_HEADER`]. The header line always ends
/// with a newline, so an empty slice renders as the header alone.
///
/// Fields are joined with commas as-is: embedded commas or quotes are not
/// escaped, so such values will split into extra columns.
pub fn to_csv(events: &EventMap) -> String {
    let rows: Vec<String> = events
        .iter()
        .flat_map(|(date, day)| {
            day.iter().map(move |ev| {
                format!(
                    "{},{},{},{},{},{}",
                    date,
                    ev.name,
                    ev.start_time,
                    ev.end_time,
                    ev.description.as_deref().unwrap_or(""),
                    ev.event_type
                )
            })
        })
        .collect();

    format!("{}\n{}", CSV_HEADER, rows.join("\n"))
}

/// Writes a month slice into `dir` and returns the created file path.
pub fn write_export(
    dir: &Path,
    events: &EventMap,
    month: YearMonth,
    format: ExportFormat,
) -> Result<PathBuf> {
    let path = dir.join(format.file_name(month));
    let contents = format.render(events)?;
    LocalStorage::atomic_write(&path, contents)
        .with_context(|| format!("Failed to write export {:?}", path))?;
    log::info!(
        "Exported {} events for {} to {:?}",
        events.values().map(Vec::len).sum::<usize>(),
        month,
        path
    );
    Ok(path)
}
