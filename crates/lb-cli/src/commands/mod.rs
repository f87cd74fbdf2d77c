//! CLI subcommand implementations.

pub mod day;
pub mod list;
pub mod range;
pub mod util;

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use lb_core::{EntryRecord, LogBook, LogEntry};

/// Reads the entries file into a fresh book indexed in `zone`.
pub fn load_book(path: &Path, zone: Tz) -> Result<LogBook> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<EntryRecord> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse entries in {}", path.display()))?;

    let book = LogBook::new(zone);
    book.add_entries(records.into_iter().map(LogEntry::from_record));
    tracing::debug!(entries = book.len(), zone = zone.name(), "loaded entries");
    Ok(book)
}

/// Formats entries one per line with local start and end times.
pub fn format_entries(entries: &[Rc<LogEntry>], zone: Tz) -> String {
    let mut output = String::new();

    if entries.is_empty() {
        writeln!(output, "No entries.").unwrap();
        return output;
    }

    for entry in entries {
        let period = entry.period();
        let start = local_time(period.start(), zone).format("%Y-%m-%d %H:%M");
        let end = local_time(period.end(), zone).format("%Y-%m-%d %H:%M");
        let title = entry.title();
        if title.is_empty() {
            writeln!(output, "{start}  {end}  {}", entry.id()).unwrap();
        } else {
            writeln!(output, "{start}  {end}  {}  {title}", entry.id()).unwrap();
        }
    }

    output
}

/// Wall-clock time of `instant` in `zone`, or UTC when the local time is not representable.
fn local_time(instant: DateTime<Utc>, zone: Tz) -> NaiveDateTime {
    let utc = instant.naive_utc();
    let offset = zone.offset_from_utc_datetime(&utc).fix();
    utc.checked_add_offset(offset).unwrap_or(utc)
}

/// Writes entries as human-readable lines or as a JSON array of records.
pub fn write_entries<W: Write>(
    writer: &mut W,
    entries: &[Rc<LogEntry>],
    zone: Tz,
    json: bool,
) -> Result<()> {
    if json {
        let records: Vec<EntryRecord> = entries.iter().map(|entry| entry.to_record()).collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&records)?)?;
    } else {
        write!(writer, "{}", format_entries(entries, zone))?;
    }
    Ok(())
}
