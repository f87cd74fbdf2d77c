//! Core domain logic for the logbook journal.
//!
//! This crate contains:
//! - Periods: immutable time spans with point and overlap classification
//! - Entries: journal records that announce their own changes
//! - The log book: an entry store indexed by start, end and calendar date

mod book;
mod entry;
pub mod period;
mod types;

pub use book::LogBook;
pub use entry::{EntryChange, EntryRecord, LogEntry};
pub use period::{Overlap, PeriodError, PeriodRecord, TimePeriod, TimeRelation};
pub use types::{EntryId, ListenerId, ValidationError};

/// Zone database re-exported so callers name zones with the same types.
pub use chrono_tz::Tz;
