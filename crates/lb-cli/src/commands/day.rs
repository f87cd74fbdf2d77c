//! Day command for listing the entries that touch one calendar date.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use lb_core::LogBook;

use super::write_entries;

#[derive(Debug, Args)]
pub struct DayArgs {
    /// Calendar date (YYYY-MM-DD) in the configured zone.
    pub date: NaiveDate,

    /// Output JSON records instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &DayArgs, book: &LogBook) -> Result<()> {
    let entries = book.entries_for_date(args.date);
    write_entries(writer, &entries, book.zone(), args.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use lb_core::{EntryId, LogEntry, TimePeriod};

    #[test]
    fn test_day_lists_touching_entries_in_start_order() {
        let book = LogBook::new(chrono_tz::UTC);
        let span = |from: (u32, u32), to: (u32, u32)| {
            TimePeriod::from_edge_instants(
                Utc.with_ymd_and_hms(2024, from.0, from.1, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, to.0, to.1, 12, 30, 0).unwrap(),
            )
        };
        book.add_entries([
            LogEntry::new(EntryId::new("short").unwrap(), span((1, 5), (1, 5))),
            LogEntry::new(EntryId::new("trip").unwrap(), span((1, 5), (2, 7))),
            LogEntry::new(EntryId::new("course").unwrap(), span((2, 1), (2, 4))),
            LogEntry::new(EntryId::new("visit").unwrap(), span((2, 3), (2, 4))),
        ]);
        let args = DayArgs {
            date: NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(),
            json: false,
        };
        let mut out = Vec::new();

        run(&mut out, &args, &book).unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        2024-01-05 12:00  2024-02-07 12:30  trip
        2024-02-01 12:00  2024-02-04 12:30  course
        2024-02-03 12:00  2024-02-04 12:30  visit
        ");
    }
}
