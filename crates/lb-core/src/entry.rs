//! Journal entries with change notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::period::TimePeriod;
use crate::types::{EntryId, ListenerId};

/// Which field of an entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryChange {
    Period,
    Title,
    Body,
}

type EntryListener = Rc<dyn Fn(&LogEntry, EntryChange)>;

/// A journal record owning one period plus free-form content.
///
/// Entries are shared as `Rc<LogEntry>` between the editor and the
/// [`LogBook`](crate::LogBook). Fields are mutated through `&self`; every
/// effective change is reported to the subscribed listeners after the new
/// value is in place. Setting a field to its current value is silent.
pub struct LogEntry {
    id: EntryId,
    period: RefCell<TimePeriod>,
    title: RefCell<String>,
    body: RefCell<String>,
    listeners: RefCell<Vec<(ListenerId, EntryListener)>>,
    /// Number of listeners at the front registered with `subscribe_first`.
    leading: Cell<usize>,
    next_listener: Cell<u64>,
}

impl LogEntry {
    pub fn new(id: EntryId, period: TimePeriod) -> Rc<Self> {
        Rc::new(Self {
            id,
            period: RefCell::new(period),
            title: RefCell::new(String::new()),
            body: RefCell::new(String::new()),
            listeners: RefCell::new(Vec::new()),
            leading: Cell::new(0),
            next_listener: Cell::new(0),
        })
    }

    /// Creates an entry with a freshly generated identifier.
    pub fn with_generated_id(period: TimePeriod) -> Rc<Self> {
        Self::new(EntryId::generate(), period)
    }

    pub fn from_record(record: EntryRecord) -> Rc<Self> {
        let entry = Self::new(record.id, record.period);
        entry.title.replace(record.title);
        entry.body.replace(record.body);
        entry
    }

    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            id: self.id.clone(),
            period: self.period(),
            title: self.title(),
            body: self.body(),
        }
    }

    pub const fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn period(&self) -> TimePeriod {
        *self.period.borrow()
    }

    /// Replaces the period, notifying listeners if anything differs.
    pub fn set_period(&self, period: TimePeriod) {
        let changed = {
            let mut current = self.period.borrow_mut();
            if current.is_identical(&period) {
                false
            } else {
                *current = period;
                true
            }
        };
        if changed {
            self.notify(EntryChange::Period);
        }
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        if Self::replace_text(&self.title, title.into()) {
            self.notify(EntryChange::Title);
        }
    }

    pub fn body(&self) -> String {
        self.body.borrow().clone()
    }

    pub fn set_body(&self, body: impl Into<String>) {
        if Self::replace_text(&self.body, body.into()) {
            self.notify(EntryChange::Body);
        }
    }

    /// Registers a listener for every subsequent change.
    ///
    /// Listeners run in registration order, after the re-indexing of every
    /// [`LogBook`](crate::LogBook) holding this entry, so a listener always
    /// queries up-to-date indices.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Self, EntryChange) + 'static,
    {
        let id = self.next_listener_id();
        let listener: EntryListener = Rc::new(listener);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Registers a listener ahead of every listener added with [`subscribe`](Self::subscribe).
    pub(crate) fn subscribe_first<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Self, EntryChange) + 'static,
    {
        let id = self.next_listener_id();
        let listener: EntryListener = Rc::new(listener);
        let mut listeners = self.listeners.borrow_mut();
        let position = self.leading.get();
        listeners.insert(position, (id, listener));
        self.leading.set(position + 1);
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(position) = listeners.iter().position(|(listener_id, _)| *listener_id == id) {
            listeners.remove(position);
            if position < self.leading.get() {
                self.leading.set(self.leading.get() - 1);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = ListenerId::new(self.next_listener.get());
        self.next_listener.set(self.next_listener.get() + 1);
        id
    }

    fn replace_text(cell: &RefCell<String>, value: String) -> bool {
        let mut current = cell.borrow_mut();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }

    fn notify(&self, change: EntryChange) {
        // Listeners may subscribe or unsubscribe while being notified.
        let listeners: Vec<EntryListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(self, change);
        }
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEntry")
            .field("id", &self.id)
            .field("period", &*self.period.borrow())
            .field("title", &*self.title.borrow())
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Structured form of a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: EntryId,
    pub period: TimePeriod,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn period(day: u32, hour: u32) -> TimePeriod {
        TimePeriod::from_edge_instants(
            Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, day, hour, 30, 0).unwrap(),
        )
    }

    fn recording(entry: &LogEntry) -> (ListenerId, Rc<RefCell<Vec<EntryChange>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = entry.subscribe(move |_, change| sink.borrow_mut().push(change));
        (id, seen)
    }

    #[test]
    fn test_set_period_notifies_after_update() {
        let entry = LogEntry::new(EntryId::new("e1").unwrap(), period(6, 12));
        let observed = Rc::new(Cell::new(None));
        let sink = Rc::clone(&observed);
        entry.subscribe(move |entry, _| sink.set(Some(entry.period())));

        entry.set_period(period(7, 12));

        assert_eq!(observed.get(), Some(period(7, 12)));
    }

    #[test]
    fn test_unchanged_values_are_silent() {
        let entry = LogEntry::new(EntryId::new("e1").unwrap(), period(6, 12));
        let (_, seen) = recording(&entry);

        entry.set_period(period(6, 12));
        entry.set_title("");
        entry.set_body("");

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_each_field_reports_its_change() {
        let entry = LogEntry::new(EntryId::new("e1").unwrap(), period(6, 12));
        let (_, seen) = recording(&entry);

        entry.set_title("Morning run");
        entry.set_body("5k along the river");
        entry.set_period(period(6, 8));

        assert_eq!(
            *seen.borrow(),
            vec![EntryChange::Title, EntryChange::Body, EntryChange::Period]
        );
        assert_eq!(entry.title(), "Morning run");
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let entry = LogEntry::new(EntryId::new("e1").unwrap(), period(6, 12));
        let (id, seen) = recording(&entry);
        let (_, other) = recording(&entry);

        entry.unsubscribe(id);
        entry.set_title("changed");

        assert!(seen.borrow().is_empty());
        assert_eq!(other.borrow().len(), 1);
        assert_eq!(entry.listener_count(), 1);
    }

    #[test]
    fn test_leading_listeners_run_before_plain_ones() {
        let entry = LogEntry::new(EntryId::new("e1").unwrap(), period(6, 12));
        let order = Rc::new(RefCell::new(Vec::new()));
        let tagged = |tag: &'static str| {
            let sink = Rc::clone(&order);
            move |_: &LogEntry, _: EntryChange| sink.borrow_mut().push(tag)
        };

        entry.subscribe(tagged("plain"));
        let first = entry.subscribe_first(tagged("leading-1"));
        entry.subscribe_first(tagged("leading-2"));
        entry.set_title("one");

        entry.unsubscribe(first);
        entry.subscribe_first(tagged("leading-3"));
        entry.set_title("two");

        assert_eq!(
            *order.borrow(),
            ["leading-1", "leading-2", "plain", "leading-2", "leading-3", "plain"]
        );
    }

    #[test]
    fn test_generated_ids_differ_between_entries() {
        let a = LogEntry::with_generated_id(period(6, 12));
        let b = LogEntry::with_generated_id(period(6, 12));

        assert_ne!(a.id(), b.id());
        assert!(!a.id().as_str().is_empty());
    }

    #[test]
    fn test_record_roundtrip_keeps_content() {
        let entry = LogEntry::new(EntryId::new("e1").unwrap(), period(6, 12));
        entry.set_title("Standup");
        entry.set_body("notes");

        let json = serde_json::to_string(&entry.to_record()).unwrap();
        let restored = LogEntry::from_record(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.id(), entry.id());
        assert!(restored.period().is_identical(&entry.period()));
        assert_eq!(restored.title(), "Standup");
        assert_eq!(restored.body(), "notes");
    }

    #[test]
    fn test_record_content_defaults_to_empty() {
        let json = r#"{"id":"e1","period":{"start":"2024-01-06T12:00:00Z","end":"2024-01-06T12:30:00Z"}}"#;
        let record: EntryRecord = serde_json::from_str(json).unwrap();
        assert!(record.title.is_empty());
        assert_eq!(record.period, period(6, 12));
    }
}
