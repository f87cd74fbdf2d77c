//! Range command for listing entries that overlap a period.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use lb_core::LogBook;

use super::util::parse_period;
use super::write_entries;

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Start: a date, RFC 3339 time, or relative time like "2 hours ago".
    pub from: String,

    /// End, in the same forms as the start.
    pub to: String,

    /// Output JSON records instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &RangeArgs, book: &LogBook) -> Result<()> {
    let period = parse_period(&args.from, &args.to, book.zone(), Utc::now())?;
    tracing::debug!(%period, "querying overlapping entries");

    let mut entries = book.entries_overlapping(&period);
    entries.sort_by(|a, b| a.period().cmp(&b.period()).then_with(|| a.id().cmp(b.id())));
    write_entries(writer, &entries, book.zone(), args.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use lb_core::{EntryId, LogEntry, TimePeriod};

    fn hours(id: &str, from: u32, to: u32) -> std::rc::Rc<LogEntry> {
        LogEntry::new(
            EntryId::new(id).unwrap(),
            TimePeriod::from_edge_instants(
                Utc.with_ymd_and_hms(2024, 1, 6, from, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 6, to, 0, 0).unwrap(),
            ),
        )
    }

    #[test]
    fn test_range_skips_entries_that_only_touch() {
        let book = LogBook::new(chrono_tz::UTC);
        book.add_entries([
            hours("before", 7, 9),
            hours("overlaps", 8, 10),
            hours("inside", 10, 11),
            hours("after", 12, 13),
        ]);
        let args = RangeArgs {
            from: "2024-01-06T09:00:00Z".to_string(),
            to: "2024-01-06T12:00:00Z".to_string(),
            json: false,
        };
        let mut out = Vec::new();

        run(&mut out, &args, &book).unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        2024-01-06 08:00  2024-01-06 10:00  overlaps
        2024-01-06 10:00  2024-01-06 11:00  inside
        ");
    }

    #[test]
    fn test_range_rejects_unparseable_edges() {
        let book = LogBook::new(chrono_tz::UTC);
        let args = RangeArgs {
            from: "soon".to_string(),
            to: "later".to_string(),
            json: false,
        };
        let mut out = Vec::new();

        assert!(run(&mut out, &args, &book).is_err());
    }
}
