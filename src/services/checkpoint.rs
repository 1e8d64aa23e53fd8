//! Incremental crawl checkpoint.
//!
//! Holds the records collected so far together with the set of their ids.
//! Appends are check-then-insert, so a record can only enter once no matter
//! how many listing views or runs return it.

use std::collections::HashSet;

use crate::models::Keyed;

/// Records collected so far plus the ids already seen.
#[derive(Debug, Clone)]
pub struct Checkpoint<T> {
    records: Vec<T>,
    seen: HashSet<String>,
}

impl<T: Keyed> Checkpoint<T> {
    /// Seed from a previous output file. Duplicates within it are dropped.
    pub fn from_records(prior: Vec<T>) -> Self {
        let mut checkpoint = Self {
            records: Vec::with_capacity(prior.len()),
            seen: HashSet::with_capacity(prior.len()),
        };
        let before = prior.len();
        for record in prior {
            checkpoint.insert(record);
        }
        if checkpoint.len() < before {
            log::warn!(
                "Dropped {} duplicate records from the previous output",
                before - checkpoint.len()
            );
        }
        checkpoint
    }

    /// Append `record` unless its id was already seen. Returns whether it was added.
    pub fn insert(&mut self, record: T) -> bool {
        if self.seen.contains(record.key()) {
            return false;
        }
        self.seen.insert(record.key().to_string());
        self.records.push(record);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }
}

impl<T: Keyed> Default for Checkpoint<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str, u32);

    impl Keyed for Item {
        fn key(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_insert_rejects_seen_ids() {
        let mut checkpoint = Checkpoint::default();
        assert!(checkpoint.insert(Item("a", 1)));
        assert!(!checkpoint.insert(Item("a", 2)));
        assert!(checkpoint.insert(Item("b", 1)));

        assert_eq!(checkpoint.len(), 2);
        // first occurrence wins
        assert_eq!(checkpoint.records()[0], Item("a", 1));
    }

    #[test]
    fn test_seeded_from_prior_output() {
        let checkpoint = Checkpoint::from_records(vec![Item("a", 1), Item("b", 1), Item("a", 3)]);
        assert_eq!(checkpoint.len(), 2);
        assert!(checkpoint.contains("a"));
        assert!(!checkpoint.contains("c"));
    }
}
