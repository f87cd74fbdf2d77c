//! The indexed entry store.
//!
//! A [`LogBook`] owns a set of shared [`LogEntry`] values and keeps three
//! derived views of them in step with their periods:
//!
//! - every entry ordered by start instant,
//! - every entry ordered by end instant,
//! - entries grouped by each calendar date their period touches.
//!
//! # Snapshot keys
//!
//! Entries are mutable, so the derived views are never keyed by the live
//! period. Each stored entry carries the period and dates it was last indexed
//! with. When an entry reports a change, the book compares against that
//! snapshot, unlinks the entry under the old key and links it under the new
//! one inside a single mutable borrow of the index. Queries cannot observe
//! the entry in both positions or in neither.
//!
//! # Threading
//!
//! The book and its entries are built on `Rc` and `RefCell`, so they are
//! neither `Send` nor `Sync`. They are meant to be driven from the one thread
//! that owns the editor. Mutating an entry from inside code that already
//! holds the book's index borrowed is a programming error and panics.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::entry::{EntryChange, LogEntry};
use crate::period::{EndKey, StartKey, TimePeriod};
use crate::types::{EntryId, ListenerId};

type BatchListener = Rc<dyn Fn(&[Rc<LogEntry>])>;

/// Period and dates an entry was last indexed with.
#[derive(Debug, Clone)]
struct Snapshot {
    period: TimePeriod,
    dates: Vec<NaiveDate>,
}

#[derive(Debug)]
struct Indexed {
    entry: Rc<LogEntry>,
    snapshot: Snapshot,
    subscription: ListenerId,
}

#[derive(Debug)]
struct BookIndex {
    zone: Tz,
    by_guid: HashMap<EntryId, Indexed>,
    by_start: BTreeMap<StartKey<EntryId>, Rc<LogEntry>>,
    by_end: BTreeMap<EndKey<EntryId>, Rc<LogEntry>>,
    by_date: BTreeMap<NaiveDate, BTreeMap<StartKey<EntryId>, Rc<LogEntry>>>,
    change_count: u64,
}

impl BookIndex {
    fn new(zone: Tz) -> Self {
        Self {
            zone,
            by_guid: HashMap::new(),
            by_start: BTreeMap::new(),
            by_end: BTreeMap::new(),
            by_date: BTreeMap::new(),
            change_count: 0,
        }
    }

    fn snapshot(&self, period: TimePeriod) -> Snapshot {
        Snapshot {
            period,
            dates: period.dates(self.zone),
        }
    }

    /// Inserts `entry` into the three derived views under `snapshot`.
    fn link(&mut self, entry: &Rc<LogEntry>, snapshot: &Snapshot) {
        let id = entry.id();
        self.by_start
            .insert(StartKey::new(snapshot.period, id.clone()), Rc::clone(entry));
        self.by_end
            .insert(EndKey::new(snapshot.period, id.clone()), Rc::clone(entry));
        for date in &snapshot.dates {
            self.by_date
                .entry(*date)
                .or_default()
                .insert(StartKey::new(snapshot.period, id.clone()), Rc::clone(entry));
        }
    }

    /// Removes `id` from the three derived views using the key it was linked with.
    fn unlink(&mut self, id: &EntryId, snapshot: &Snapshot) {
        let start_key = StartKey::new(snapshot.period, id.clone());
        self.by_start.remove(&start_key);
        self.by_end.remove(&EndKey::new(snapshot.period, id.clone()));
        for date in &snapshot.dates {
            if let Some(group) = self.by_date.get_mut(date) {
                group.remove(&start_key);
                if group.is_empty() {
                    self.by_date.remove(date);
                }
            }
        }
    }

    /// Handles a change notification from a stored entry.
    fn entry_changed(&mut self, entry: &LogEntry) {
        self.change_count += 1;

        let Some(indexed) = self.by_guid.get_mut(entry.id()) else {
            tracing::warn!(entry = %entry.id(), "change from an entry this book does not hold");
            return;
        };
        if !std::ptr::eq(Rc::as_ptr(&indexed.entry), entry) {
            tracing::warn!(entry = %entry.id(), "change from a replaced entry");
            return;
        }

        let period = entry.period();
        if indexed.snapshot.period == period {
            // Same edges, so the keys and dates still hold.
            indexed.snapshot.period = period;
            return;
        }

        let stored = Rc::clone(&indexed.entry);
        let old = indexed.snapshot.clone();
        let new = self.snapshot(period);

        self.unlink(entry.id(), &old);
        self.link(&stored, &new);
        tracing::trace!(entry = %entry.id(), from = %old.period, to = %new.period, "re-indexed entry");

        if let Some(indexed) = self.by_guid.get_mut(entry.id()) {
            indexed.snapshot = new;
        }
    }

    /// Rebuilds every derived view, recomputing dates in the current zone.
    fn rebuild(&mut self) {
        self.by_start.clear();
        self.by_end.clear();
        self.by_date.clear();

        let entries: Vec<Rc<LogEntry>> = self
            .by_guid
            .values()
            .map(|indexed| Rc::clone(&indexed.entry))
            .collect();
        for entry in entries {
            let snapshot = self.snapshot(entry.period());
            self.link(&entry, &snapshot);
            if let Some(indexed) = self.by_guid.get_mut(entry.id()) {
                indexed.snapshot = snapshot;
            }
        }
    }
}

/// Registered batch callbacks.
#[derive(Default)]
struct BatchListeners {
    added: Vec<(ListenerId, BatchListener)>,
    removed: Vec<(ListenerId, BatchListener)>,
    next_id: u64,
}

impl BatchListeners {
    fn next_id(&mut self) -> ListenerId {
        let id = ListenerId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Store of journal entries indexed by start, end and calendar date.
///
/// All entries are indexed against one zone, fixed at construction and
/// changeable with [`set_zone`](Self::set_zone).
pub struct LogBook {
    index: Rc<RefCell<BookIndex>>,
    listeners: RefCell<BatchListeners>,
}

impl LogBook {
    pub fn new(zone: Tz) -> Self {
        Self {
            index: Rc::new(RefCell::new(BookIndex::new(zone))),
            listeners: RefCell::new(BatchListeners::default()),
        }
    }

    /// Zone used for calendar-date membership.
    pub fn zone(&self) -> Tz {
        self.index.borrow().zone
    }

    /// Changes the zone and recomputes the date grouping of every entry.
    pub fn set_zone(&self, zone: Tz) {
        let mut index = self.index.borrow_mut();
        if index.zone == zone {
            return;
        }
        tracing::debug!(from = %index.zone.name(), to = %zone.name(), "re-indexing for new zone");
        index.zone = zone;
        index.rebuild();
        index.change_count += 1;
    }

    pub fn len(&self) -> usize {
        self.index.borrow().by_guid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.borrow().by_guid.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.index.borrow().by_guid.contains_key(id)
    }

    pub fn entry(&self, id: &EntryId) -> Option<Rc<LogEntry>> {
        self.index
            .borrow()
            .by_guid
            .get(id)
            .map(|indexed| Rc::clone(&indexed.entry))
    }

    /// Adds or replaces entries by identifier.
    ///
    /// An entry that is already stored as the same object with the same
    /// period is skipped. A different object under a stored identifier
    /// replaces the old one, which is reported as removed. Once the whole
    /// batch is applied, the removed batch is announced before the added one.
    pub fn add_entries<I>(&self, entries: I)
    where
        I: IntoIterator<Item = Rc<LogEntry>>,
    {
        let mut added: Vec<Rc<LogEntry>> = Vec::new();
        let mut removed: Vec<Rc<LogEntry>> = Vec::new();

        {
            let mut index = self.index.borrow_mut();
            for entry in entries {
                let period = entry.period();
                let unchanged = index.by_guid.get(entry.id()).is_some_and(|existing| {
                    Rc::ptr_eq(&existing.entry, &entry) && existing.snapshot.period == period
                });
                if unchanged {
                    continue;
                }

                let snapshot = index.snapshot(period);
                let subscription = entry.subscribe_first(self.reindex_listener());
                let previous = index.by_guid.insert(
                    entry.id().clone(),
                    Indexed {
                        entry: Rc::clone(&entry),
                        snapshot: snapshot.clone(),
                        subscription,
                    },
                );

                if let Some(previous) = previous {
                    index.unlink(entry.id(), &previous.snapshot);
                    previous.entry.unsubscribe(previous.subscription);
                    // Replacing something added earlier in this batch is not a removal.
                    if let Some(pos) = added.iter().position(|e| Rc::ptr_eq(e, &previous.entry)) {
                        added.remove(pos);
                    } else {
                        removed.push(previous.entry);
                    }
                }

                index.link(&entry, &snapshot);
                index.change_count += 1;
                added.push(entry);
            }
        }

        tracing::debug!(added = added.len(), removed = removed.len(), "added entries");
        self.fire_removed(&removed);
        self.fire_added(&added);
    }

    /// Removes entries by identifier. Unknown identifiers are ignored.
    pub fn remove_entries<'a, I>(&self, ids: I)
    where
        I: IntoIterator<Item = &'a EntryId>,
    {
        let mut removed: Vec<Rc<LogEntry>> = Vec::new();

        {
            let mut index = self.index.borrow_mut();
            for id in ids {
                let Some(indexed) = index.by_guid.remove(id) else {
                    continue;
                };
                index.unlink(id, &indexed.snapshot);
                indexed.entry.unsubscribe(indexed.subscription);
                index.change_count += 1;
                removed.push(indexed.entry);
            }
        }

        tracing::debug!(removed = removed.len(), "removed entries");
        self.fire_removed(&removed);
    }

    /// Every entry ordered by start, then identifier.
    pub fn entries_sorted_by_start(&self) -> Vec<Rc<LogEntry>> {
        self.index.borrow().by_start.values().cloned().collect()
    }

    /// Every entry ordered by end, then identifier.
    pub fn entries_sorted_by_end(&self) -> Vec<Rc<LogEntry>> {
        self.index.borrow().by_end.values().cloned().collect()
    }

    /// Entries touching `date` in the book's zone, ordered by start.
    pub fn entries_for_date(&self, date: NaiveDate) -> Vec<Rc<LogEntry>> {
        self.index
            .borrow()
            .by_date
            .get(&date)
            .map_or_else(Vec::new, |group| group.values().cloned().collect())
    }

    /// Entries sharing interior time with `period`, ordered by end.
    ///
    /// Entries that merely touch one of its edges are excluded. Only entries
    /// ending at or after `period` starts are classified.
    pub fn entries_overlapping(&self, period: &TimePeriod) -> Vec<Rc<LogEntry>> {
        let index = self.index.borrow();
        let probe = EndKey::probe(TimePeriod::from_edge_instants(period.start(), period.start()));
        index
            .by_end
            .range(probe..)
            .filter(|(key, _)| key.period.overlap(period).is_overlapping())
            .map(|(_, entry)| Rc::clone(entry))
            .collect()
    }

    /// Dates with at least one entry, ascending.
    pub fn dates_with_entries(&self) -> Vec<NaiveDate> {
        self.index.borrow().by_date.keys().copied().collect()
    }

    /// Monotonic counter bumped by every structural or entry-level change.
    pub fn change_count(&self) -> u64 {
        self.index.borrow().change_count
    }

    /// Whether anything changed since `mark` was read from [`change_count`](Self::change_count).
    pub fn has_changed_since(&self, mark: u64) -> bool {
        self.change_count() != mark
    }

    /// Registers a callback for each non-empty batch of added entries.
    pub fn on_entries_added<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[Rc<LogEntry>]) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id();
        listeners.added.push((id, Rc::new(listener)));
        id
    }

    /// Registers a callback for each non-empty batch of removed entries.
    pub fn on_entries_removed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[Rc<LogEntry>]) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id();
        listeners.removed.push((id, Rc::new(listener)));
        id
    }

    /// Unregisters an added or removed callback.
    pub fn remove_listener(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.added.retain(|(listener_id, _)| *listener_id != id);
        listeners.removed.retain(|(listener_id, _)| *listener_id != id);
    }

    fn reindex_listener(&self) -> impl Fn(&LogEntry, EntryChange) + 'static {
        let index: Weak<RefCell<BookIndex>> = Rc::downgrade(&self.index);
        move |entry: &LogEntry, _change: EntryChange| {
            if let Some(index) = index.upgrade() {
                index.borrow_mut().entry_changed(entry);
            }
        }
    }

    fn fire_added(&self, entries: &[Rc<LogEntry>]) {
        if entries.is_empty() {
            return;
        }
        let listeners: Vec<BatchListener> = self
            .listeners
            .borrow()
            .added
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        Self::fire(&listeners, entries);
    }

    fn fire_removed(&self, entries: &[Rc<LogEntry>]) {
        if entries.is_empty() {
            return;
        }
        let listeners: Vec<BatchListener> = self
            .listeners
            .borrow()
            .removed
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        Self::fire(&listeners, entries);
    }

    fn fire(listeners: &[BatchListener], entries: &[Rc<LogEntry>]) {
        for listener in listeners {
            listener(entries);
        }
    }
}

impl Drop for LogBook {
    fn drop(&mut self) {
        for indexed in self.index.borrow().by_guid.values() {
            indexed.entry.unsubscribe(indexed.subscription);
        }
    }
}

impl std::fmt::Debug for LogBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.borrow();
        f.debug_struct("LogBook")
            .field("zone", &index.zone)
            .field("entries", &index.by_guid.len())
            .field("dates", &index.by_date.len())
            .field("change_count", &index.change_count)
            .finish()
    }
}
