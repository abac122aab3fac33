//! Ordered in-memory store for one view's records.
//!
//! The collection keeps backend order, guarantees id uniqueness, and bumps a
//! revision counter on every change so derived state (facet options) can be
//! memoized against it.

use crate::catalog::identity::RecordId;
use crate::catalog::record::Record;
use std::collections::HashSet;

#[derive(Clone, Debug, Default)]
/// Records of one view in the order the backend returned them.
pub struct Collection {
    records: Vec<Record>,
    revision: u64,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents wholesale.
    ///
    /// Later duplicates of an id are dropped; the number dropped is returned so
    /// callers can report a misbehaving backend.
    pub fn replace(&mut self, records: Vec<Record>) -> usize {
        let mut seen: HashSet<RecordId> = HashSet::with_capacity(records.len());
        let before = records.len();
        self.records = records
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .collect();
        self.revision += 1;
        before - self.records.len()
    }

    /// Remove the record with `id`, if present.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        let pos = self.records.iter().position(|record| &record.id == id)?;
        self.revision += 1;
        Some(self.records.remove(pos))
    }

    /// Append a record, or overwrite in place when its id is already present.
    pub fn upsert(&mut self, record: Record) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.revision += 1;
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Monotonic change counter; differs after every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn record(id: i64, title: &str) -> Record {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(title));
        Record::new(id, fields)
    }

    #[test]
    fn replace_drops_later_duplicates() {
        let mut collection = Collection::new();
        let dropped = collection.replace(vec![record(1, "a"), record(2, "b"), record(1, "c")]);
        assert_eq!(dropped, 1);
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.get(&RecordId::from(1)).and_then(|r| r.field_text("title")).as_deref(),
            Some("a")
        );
    }

    #[test]
    fn remove_is_exact_and_idempotent() {
        let mut collection = Collection::new();
        collection.replace(vec![record(1, "a"), record(2, "b")]);
        let rev = collection.revision();

        assert!(collection.remove(&RecordId::from("1")).is_some());
        assert_eq!(collection.len(), 1);
        assert!(collection.revision() > rev);

        let rev = collection.revision();
        assert!(collection.remove(&RecordId::from(1)).is_none());
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.revision(), rev, "no-op removal keeps revision");
    }

    #[test]
    fn upsert_never_duplicates_ids() {
        let mut collection = Collection::new();
        collection.replace(vec![record(1, "a"), record(2, "b")]);
        collection.upsert(record(3, "c"));
        collection.upsert(record(1, "a2"));

        let ids: Vec<String> = collection.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(
            collection.records()[0].field_text("title").as_deref(),
            Some("a2")
        );
    }
}
