use std::collections::{HashMap, HashSet};

use shared::{domain::RecordId, resource::Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Present in the last applied server page.
    Confirmed,
    /// Written locally and not yet seen in a server page.
    Provisional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry<T> {
    pub record: T,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalWrite {
    Upsert,
    Deleted,
}

struct StoreEntry<T> {
    record: T,
    status: EntryStatus,
}

/// Identifier-keyed record store shared by server pages and optimistic writes.
///
/// Invariants:
/// - every stored id sits in exactly one of `page` (confirmed) or `overlay`
///   (provisional), so the merged view never repeats an id;
/// - a page fetched with sequence `s` never overrides a local write with a
///   sequence greater than `s`, including deletes.
pub struct RecordStore<R: Resource> {
    entries: HashMap<RecordId, StoreEntry<R::Record>>,
    page: Vec<RecordId>,
    overlay: Vec<RecordId>,
    local_writes: HashMap<RecordId, (u64, LocalWrite)>,
    highest_seen: i64,
    last_fallback: i64,
}

impl<R: Resource> Default for RecordStore<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            page: Vec::new(),
            overlay: Vec::new(),
            local_writes: HashMap::new(),
            highest_seen: 0,
            last_fallback: 0,
        }
    }
}

impl<R: Resource> RecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: RecordId) -> Option<&R::Record> {
        self.entries.get(&id).map(|entry| &entry.record)
    }

    pub fn status(&self, id: RecordId) -> Option<EntryStatus> {
        self.entries.get(&id).map(|entry| entry.status)
    }

    pub fn provisional_len(&self) -> usize {
        self.overlay.len()
    }

    /// Replaces the confirmed page with `records`, fetched under sequence `seq`.
    ///
    /// Provisional entries whose id shows up in the page are promoted to
    /// confirmed and leave the overlay.
    pub fn apply_page(&mut self, seq: u64, records: Vec<R::Record>) {
        let previous = std::mem::take(&mut self.page);
        let mut page = Vec::with_capacity(records.len());
        let mut in_page = HashSet::with_capacity(records.len());

        for record in records {
            let id = R::id(&record);
            if !in_page.insert(id) {
                continue;
            }
            self.note_seen(id);

            match self.local_writes.get(&id) {
                Some(&(write_seq, LocalWrite::Deleted)) if write_seq > seq => continue,
                Some(&(write_seq, LocalWrite::Upsert)) if write_seq > seq => {
                    // The local version is newer than this page; keep it.
                    self.entries
                        .entry(id)
                        .or_insert(StoreEntry {
                            record,
                            status: EntryStatus::Confirmed,
                        })
                        .status = EntryStatus::Confirmed;
                }
                _ => {
                    self.entries.insert(
                        id,
                        StoreEntry {
                            record,
                            status: EntryStatus::Confirmed,
                        },
                    );
                }
            }
            page.push(id);
        }

        for id in previous {
            if !in_page.contains(&id) {
                self.entries.remove(&id);
            }
        }
        self.overlay.retain(|id| !in_page.contains(id));
        self.page = page;
        self.local_writes.retain(|_, (write_seq, _)| *write_seq > seq);
    }

    /// Appends a freshly created record to the overlay.
    pub fn insert_provisional(&mut self, seq: u64, record: R::Record) {
        let id = R::id(&record);
        self.note_seen(id);
        self.local_writes.insert(id, (seq, LocalWrite::Upsert));
        if self.entries.contains_key(&id) {
            self.page.retain(|existing| *existing != id);
            self.overlay.retain(|existing| *existing != id);
        }
        self.entries.insert(
            id,
            StoreEntry {
                record,
                status: EntryStatus::Provisional,
            },
        );
        self.overlay.push(id);
    }

    /// Rewrites an existing entry in place. Returns `false` when `id` is not stored.
    pub fn replace(&mut self, seq: u64, record: R::Record) -> bool {
        let id = R::id(&record);
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        entry.record = record;
        self.local_writes.insert(id, (seq, LocalWrite::Upsert));
        true
    }

    /// Drops `id` from the view and remembers the delete so older pages cannot
    /// bring it back. Returns whether an entry was removed.
    pub fn remove(&mut self, seq: u64, id: RecordId) -> bool {
        self.local_writes.insert(id, (seq, LocalWrite::Deleted));
        self.page.retain(|existing| *existing != id);
        self.overlay.retain(|existing| *existing != id);
        self.entries.remove(&id).is_some()
    }

    /// Client-side identifier for a create response that carried none.
    ///
    /// Derived from `now_micros` but always above every id seen so far and
    /// every fallback handed out before.
    pub fn fallback_id(&mut self, now_micros: i64) -> RecordId {
        let next = now_micros
            .max(self.highest_seen.saturating_add(1))
            .max(self.last_fallback.saturating_add(1));
        self.last_fallback = next;
        self.note_seen(RecordId(next));
        RecordId(next)
    }

    /// Page records in server order, then provisional records in creation order.
    pub fn merged(&self) -> Vec<R::Record> {
        self.page
            .iter()
            .chain(self.overlay.iter())
            .filter_map(|id| self.get(*id).cloned())
            .collect()
    }

    pub fn merged_entries(&self) -> Vec<ViewEntry<R::Record>> {
        self.page
            .iter()
            .chain(self.overlay.iter())
            .filter_map(|id| self.entries.get(id))
            .map(|entry| ViewEntry {
                record: entry.record.clone(),
                status: entry.status,
            })
            .collect()
    }

    fn note_seen(&mut self, id: RecordId) {
        self.highest_seen = self.highest_seen.max(id.0);
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
