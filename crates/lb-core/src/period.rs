//! Immutable time periods.
//!
//! A [`TimePeriod`] is a closed-open span `[start, end)` of absolute time.
//! It is built either from precise instants or from whole calendar dates in
//! a given zone, in which case it runs from the first date's midnight to the
//! midnight following the last date.
//!
//! # Relations
//!
//! - [`TimePeriod::time_relation`] classifies a point against the period with
//!   closed edges, so a point equal to either edge is reported as that edge.
//! - [`TimePeriod::overlap`] classifies another period as seen from this one.
//!   The relation is asymmetric but always agrees with
//!   [`Overlap::complement`] in the other direction.
//!
//! # Calendar days
//!
//! Day membership depends on a zone. A period touches every date from the one
//! containing its start up to the one containing its end, except that a period
//! ending exactly on a midnight does not touch the day beginning there.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{
    DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat, TimeDelta, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing a period.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// The local date-time falls into a zone transition gap.
    #[error("local time {local} does not exist in {}", zone.name())]
    NonexistentLocalTime { local: NaiveDateTime, zone: Tz },

    /// An edge would fall outside the representable range.
    #[error("period edge out of range")]
    OutOfRange,

    /// A serialized period was self-contradictory.
    #[error("invalid period record: {0}")]
    InvalidRecord(&'static str),
}

/// Position of an instant relative to a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRelation {
    Before,
    OnStartEdge,
    Inside,
    OnEndEdge,
    After,
}

/// How another period relates to this one, seen from this period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlap {
    /// The periods do not touch.
    None,
    /// This period ends exactly where the other starts.
    TouchOtherStart,
    /// This period starts exactly where the other ends.
    TouchOtherEnd,
    /// The other period starts strictly inside this one and ends after it.
    OtherStart,
    /// The other period ends strictly inside this one and starts before it.
    OtherEnd,
    /// Both edges are identical.
    Same,
    /// The other period lies within this one.
    EnclosesOther,
    /// This period lies within the other one.
    InsideOther,
}

impl Overlap {
    /// The relation the other period reports when asked about this one.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::TouchOtherStart => Self::TouchOtherEnd,
            Self::TouchOtherEnd => Self::TouchOtherStart,
            Self::OtherStart => Self::OtherEnd,
            Self::OtherEnd => Self::OtherStart,
            Self::Same => Self::Same,
            Self::EnclosesOther => Self::InsideOther,
            Self::InsideOther => Self::EnclosesOther,
        }
    }

    /// Whether the periods share interior time, as opposed to merely touching.
    #[must_use]
    pub const fn is_overlapping(self) -> bool {
        matches!(
            self,
            Self::OtherStart
                | Self::OtherEnd
                | Self::Same
                | Self::EnclosesOther
                | Self::InsideOther
        )
    }
}

/// A closed-open span of time.
///
/// Equality, hashing and ordering only look at `(start, end)`. Whole-day
/// metadata and the zone are carried along for display and serialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "PeriodRecord", into = "PeriodRecord")]
pub struct TimePeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    zone: Option<Tz>,
    full_days: Option<(NaiveDate, NaiveDate)>,
}

impl TimePeriod {
    /// Builds a precise period from two instants in either order.
    #[must_use]
    pub fn from_edge_instants(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start,
            end,
            zone: None,
            full_days: None,
        }
    }

    /// Builds a precise period from two local date-times interpreted in `zone`.
    ///
    /// Ambiguous local times resolve to the earlier instant.
    pub fn from_local_edges(
        a: NaiveDateTime,
        b: NaiveDateTime,
        zone: Tz,
    ) -> Result<Self, PeriodError> {
        let period = Self::from_edge_instants(resolve_local(a, zone)?, resolve_local(b, zone)?);
        Ok(period.with_zone(zone))
    }

    /// Builds a precise period anchored at `edge`.
    ///
    /// A negative `duration` makes `edge` the end of the period.
    pub fn from_edge_and_duration(
        edge: DateTime<Utc>,
        duration: TimeDelta,
    ) -> Result<Self, PeriodError> {
        let other = edge
            .checked_add_signed(duration)
            .ok_or(PeriodError::OutOfRange)?;
        Ok(Self::from_edge_instants(edge, other))
    }

    /// Like [`from_edge_and_duration`](Self::from_edge_and_duration) with a
    /// local anchor interpreted in `zone`.
    pub fn from_local_edge_and_duration(
        edge: NaiveDateTime,
        duration: TimeDelta,
        zone: Tz,
    ) -> Result<Self, PeriodError> {
        let period = Self::from_edge_and_duration(resolve_local(edge, zone)?, duration)?;
        Ok(period.with_zone(zone))
    }

    /// Builds a whole-day period covering both dates and every date between.
    pub fn from_edge_dates(a: NaiveDate, b: NaiveDate, zone: Tz) -> Result<Self, PeriodError> {
        let (first, last) = if a <= b { (a, b) } else { (b, a) };
        let after_last = last.succ_opt().ok_or(PeriodError::OutOfRange)?;
        Ok(Self {
            start: day_start(first, zone),
            end: day_start(after_last, zone),
            zone: Some(zone),
            full_days: Some((first, last)),
        })
    }

    /// Smallest period enclosing both `a` and `b`, whether or not they overlap.
    ///
    /// Two whole-day periods in the same zone join into a whole-day period.
    #[must_use]
    pub fn join_periods(a: &Self, b: &Self) -> Self {
        let mut joined = Self::from_edge_instants(a.start.min(b.start), a.end.max(b.end));
        if a.zone == b.zone {
            joined.zone = a.zone;
            if let (Some((a_first, a_last)), Some((b_first, b_last))) = (a.full_days, b.full_days) {
                joined.full_days = Some((a_first.min(b_first), a_last.max(b_last)));
            }
        }
        joined
    }

    const fn with_zone(mut self, zone: Tz) -> Self {
        self.zone = Some(zone);
        self
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// The zone this period was built in, if it was built from local values.
    #[must_use]
    pub const fn zone(&self) -> Option<Tz> {
        self.zone
    }

    /// First and last date of a whole-day period.
    #[must_use]
    pub const fn full_days(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.full_days
    }

    #[must_use]
    pub const fn is_full_day(&self) -> bool {
        self.full_days.is_some()
    }

    /// Number of calendar days covered by a whole-day period.
    #[must_use]
    pub fn full_day_count(&self) -> Option<i64> {
        self.full_days
            .map(|(first, last)| (last - first).num_days() + 1)
    }

    /// Compares every field, not only the edges.
    #[must_use]
    pub fn is_identical(&self, other: &Self) -> bool {
        self == other && self.zone == other.zone && self.full_days == other.full_days
    }

    /// Classifies `point` against this period with closed edges.
    ///
    /// For a zero-length period the start edge wins.
    pub fn time_relation<Z: TimeZone>(&self, point: &DateTime<Z>) -> TimeRelation {
        let point = point.with_timezone(&Utc);
        match (point.cmp(&self.start), point.cmp(&self.end)) {
            (Ordering::Less, _) => TimeRelation::Before,
            (Ordering::Equal, _) => TimeRelation::OnStartEdge,
            (_, Ordering::Less) => TimeRelation::Inside,
            (_, Ordering::Equal) => TimeRelation::OnEndEdge,
            (_, Ordering::Greater) => TimeRelation::After,
        }
    }

    /// Classifies a local date-time interpreted in `zone`.
    pub fn time_relation_local(
        &self,
        point: NaiveDateTime,
        zone: Tz,
    ) -> Result<TimeRelation, PeriodError> {
        Ok(self.time_relation(&resolve_local(point, zone)?))
    }

    /// Classifies `other` as seen from this period.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Overlap {
        let (s1, e1) = (self.start, self.end);
        let (s2, e2) = (other.start, other.end);

        if s1 == s2 && e1 == e2 {
            Overlap::Same
        } else if e1 < s2 || e2 < s1 {
            Overlap::None
        } else if s1 <= s2 && e2 <= e1 {
            Overlap::EnclosesOther
        } else if s2 <= s1 && e1 <= e2 {
            Overlap::InsideOther
        } else if e1 == s2 {
            Overlap::TouchOtherStart
        } else if s1 == e2 {
            Overlap::TouchOtherEnd
        } else if s1 < s2 {
            Overlap::OtherStart
        } else {
            Overlap::OtherEnd
        }
    }

    /// Whether `other` lies entirely within this period.
    #[must_use]
    pub fn contains_period(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether this period touches any part of `date` in `zone`.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate, zone: Tz) -> bool {
        let (day_start, day_end) = day_bounds(date, zone);
        if self.start == self.end {
            day_start <= self.start && self.start < day_end
        } else {
            self.start < day_end && self.end > day_start
        }
    }

    /// Appends every date this period touches in `zone`, in ascending order.
    ///
    /// `out` is not cleared, so a set can accumulate dates over several periods.
    pub fn collect_dates<E: Extend<NaiveDate>>(&self, out: &mut E, zone: Tz) {
        let first = local_date(self.start, zone);
        let mut last = local_date(self.end, zone);
        if self.end > self.start && day_start(last, zone) == self.end {
            last = last.pred_opt().unwrap_or(last);
        }
        // `iter_days` never yields `NaiveDate::MAX`, which edges near the end of
        // time can reach.
        out.extend(
            std::iter::successors(Some(first), |date| date.succ_opt())
                .take_while(|date| *date <= last),
        );
    }

    /// Dates this period touches in `zone`, in ascending order.
    #[must_use]
    pub fn dates(&self, zone: Tz) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        self.collect_dates(&mut dates, zone);
        dates
    }

    /// Orders by start instant only.
    #[must_use]
    pub fn cmp_by_start(&self, other: &Self) -> Ordering {
        self.start.cmp(&other.start)
    }

    /// Orders by end instant only.
    #[must_use]
    pub fn cmp_by_end(&self, other: &Self) -> Ordering {
        self.end.cmp(&other.end)
    }
}

impl PartialEq for TimePeriod {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl Eq for TimePeriod {}

impl Hash for TimePeriod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.end.hash(state);
    }
}

impl PartialOrd for TimePeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_by_start(other)
            .then_with(|| self.cmp_by_end(other))
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.full_days, self.zone) {
            (Some((first, last)), Some(zone)) => {
                write!(f, "{first}..={last} [{}]", zone.name())
            }
            _ => write!(
                f,
                "{}..{}",
                self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ),
        }
    }
}

/// Index key ordering periods by start, ties broken by owner.
///
/// A key without an owner sorts before every owned key with the same start,
/// which makes it usable as a range probe.
#[derive(Debug, Clone)]
pub struct StartKey<O> {
    pub period: TimePeriod,
    pub owner: Option<O>,
}

/// Index key ordering periods by end, ties broken by owner.
#[derive(Debug, Clone)]
pub struct EndKey<O> {
    pub period: TimePeriod,
    pub owner: Option<O>,
}

macro_rules! impl_edge_key {
    ($key:ident, $cmp:ident) => {
        impl<O> $key<O> {
            pub const fn new(period: TimePeriod, owner: O) -> Self {
                Self {
                    period,
                    owner: Some(owner),
                }
            }

            pub const fn probe(period: TimePeriod) -> Self {
                Self {
                    period,
                    owner: None,
                }
            }
        }

        impl<O: Ord> Ord for $key<O> {
            fn cmp(&self, other: &Self) -> Ordering {
                self.period
                    .$cmp(&other.period)
                    .then_with(|| self.owner.cmp(&other.owner))
            }
        }

        impl<O: Ord> PartialOrd for $key<O> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<O: Ord> PartialEq for $key<O> {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        impl<O: Ord> Eq for $key<O> {}
    };
}

impl_edge_key!(StartKey, cmp_by_start);
impl_edge_key!(EndKey, cmp_by_end);

/// Structured form of a [`TimePeriod`].
///
/// `zone` is absent for periods built from instants. Whole-day periods carry
/// both dates and their zone; their edges are checked against the dates on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Tz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
}

impl From<TimePeriod> for PeriodRecord {
    fn from(period: TimePeriod) -> Self {
        Self {
            start: period.start,
            end: period.end,
            zone: period.zone,
            first_date: period.full_days.map(|(first, _)| first),
            last_date: period.full_days.map(|(_, last)| last),
        }
    }
}

impl TryFrom<PeriodRecord> for TimePeriod {
    type Error = PeriodError;

    fn try_from(record: PeriodRecord) -> Result<Self, Self::Error> {
        match (record.first_date, record.last_date, record.zone) {
            (Some(first), Some(last), Some(zone)) => {
                let period = Self::from_edge_dates(first, last, zone)?;
                if period.start != record.start || period.end != record.end {
                    return Err(PeriodError::InvalidRecord(
                        "whole-day edges do not match their dates",
                    ));
                }
                Ok(period)
            }
            (Some(_), Some(_), None) => Err(PeriodError::InvalidRecord(
                "whole-day period without a zone",
            )),
            (Some(_), None, _) | (None, Some(_), _) => Err(PeriodError::InvalidRecord(
                "incomplete whole-day date pair",
            )),
            (None, None, zone) => {
                let period = Self::from_edge_instants(record.start, record.end);
                Ok(Self { zone, ..period })
            }
        }
    }
}

fn resolve_local(local: NaiveDateTime, zone: Tz) -> Result<DateTime<Utc>, PeriodError> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(PeriodError::NonexistentLocalTime { local, zone })
}

/// Calendar date of `instant` in `zone`.
///
/// Instants whose local time falls past the representable range clamp to the
/// first or last representable date.
fn local_date(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    let utc = instant.naive_utc();
    let offset = zone.offset_from_utc_datetime(&utc).fix();
    utc.checked_add_offset(offset).map_or_else(
        || {
            if offset.local_minus_utc() > 0 {
                NaiveDate::MAX
            } else {
                NaiveDate::MIN
            }
        },
        |local| local.date(),
    )
}

/// First instant of `date` in `zone`.
///
/// When midnight falls into a transition gap the day starts at the first
/// whole hour that exists.
pub(crate) fn day_start(date: NaiveDate, zone: Tz) -> DateTime<Utc> {
    (0..24)
        .find_map(|hour| {
            let local = date.and_hms_opt(hour, 0, 0)?;
            zone.from_local_datetime(&local).earliest()
        })
        .map_or_else(
            || date.and_time(NaiveTime::MIN).and_utc(),
            |dt| dt.with_timezone(&Utc),
        )
}

fn day_bounds(date: NaiveDate, zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = date
        .succ_opt()
        .map_or(DateTime::<Utc>::MAX_UTC, |next| day_start(next, zone));
    (day_start(date, zone), end)
}
