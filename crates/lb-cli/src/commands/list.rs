//! List command for showing every entry in start or end order.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use lb_core::LogBook;

use super::write_entries;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Order by end instead of start.
    #[arg(long)]
    pub by_end: bool,

    /// Output JSON records instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ListArgs, book: &LogBook) -> Result<()> {
    let entries = if args.by_end {
        book.entries_sorted_by_end()
    } else {
        book.entries_sorted_by_start()
    };
    write_entries(writer, &entries, book.zone(), args.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use lb_core::{EntryId, LogEntry, TimePeriod};

    fn book() -> LogBook {
        let book = LogBook::new(chrono_tz::UTC);
        let period = |from: u32, to: u32| {
            TimePeriod::from_edge_instants(
                Utc.with_ymd_and_hms(2024, 1, from, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, to, 9, 0, 0).unwrap(),
            )
        };
        book.add_entries([
            LogEntry::new(EntryId::new("week").unwrap(), period(1, 8)),
            LogEntry::new(EntryId::new("day").unwrap(), period(3, 4)),
        ]);
        book
    }

    #[test]
    fn test_list_by_start() {
        let mut out = Vec::new();
        let args = ListArgs {
            by_end: false,
            json: false,
        };

        run(&mut out, &args, &book()).unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        2024-01-01 09:00  2024-01-08 09:00  week
        2024-01-03 09:00  2024-01-04 09:00  day
        ");
    }

    #[test]
    fn test_list_by_end() {
        let mut out = Vec::new();
        let args = ListArgs {
            by_end: true,
            json: false,
        };

        run(&mut out, &args, &book()).unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        2024-01-03 09:00  2024-01-04 09:00  day
        2024-01-01 09:00  2024-01-08 09:00  week
        ");
    }
}
