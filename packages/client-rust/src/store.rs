//! De-duplicated, ordered client materialization of one query's results.
//!
//! [`RecordStore`] is owned by exactly one `FetchCoordinator` and performs
//! no I/O. All mutations are synchronous and atomic behind an internal
//! lock; readers get point-in-time snapshots.
//!
//! Two invariants this module enforces regardless of what the backend
//! sends:
//!
//! - **Key uniqueness**: a later-fetched record with a colliding key
//!   replaces the earlier one in place, never duplicates.
//! - **Monotonic `has_more`**: within one query lifetime the flag may go
//!   from `true` to `false` but never back; a regression is clamped and
//!   logged as a warning, since it would mean the server total shrank
//!   mid-scroll.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

/// Key extractor supplied by the caller. The engine never inspects record
/// fields itself.
pub type KeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// How `has_more` is derived after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasMorePolicy {
    /// Reconstruct from the latest server-reported total:
    /// `records.len() < total`. Used with offset pagination.
    FromTotal,
    /// Trust the server-supplied boolean directly. Used with token
    /// pagination, where totals may be absent or approximate.
    ServerReported,
}

/// Aggregate list state visible to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    /// Records in display order.
    pub records: Vec<T>,
    /// Latest known total across all pages.
    pub total: u64,
    /// Whether more pages can be fetched.
    pub has_more: bool,
}

impl<T> Default for ListSnapshot<T> {
    fn default() -> Self {
        Self { records: Vec::new(), total: 0, has_more: false }
    }
}

struct StoreInner<T> {
    records: Vec<T>,
    /// Key to position in `records`. Rebuilt on structural mutations.
    index: HashMap<String, usize>,
    total: u64,
    has_more: bool,
    /// Keys removed locally within this query lifetime. Filtered out of
    /// every subsequent server page so a local removal always wins over
    /// in-flight or lagging responses.
    tombstones: HashSet<String>,
}

/// Ordered, de-duplicated collection of fetched records plus aggregate
/// metadata for one query.
pub struct RecordStore<T> {
    key_of: KeyFn<T>,
    policy: HasMorePolicy,
    inner: RwLock<StoreInner<T>>,
}

impl<T: Clone> RecordStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new(key_of: KeyFn<T>, policy: HasMorePolicy) -> Self {
        Self {
            key_of,
            policy,
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                index: HashMap::new(),
                total: 0,
                has_more: false,
                tombstones: HashSet::new(),
            }),
        }
    }

    /// Resets to the empty state, starting a new query lifetime.
    /// Tombstones from the previous query are discarded.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.records.clear();
        inner.index.clear();
        inner.total = 0;
        inner.has_more = false;
        inner.tombstones.clear();
    }

    /// Atomically swaps the full list for this snapshot.
    ///
    /// No monotonicity guard applies: `replace` starts a fresh baseline
    /// (it runs on the first page of a new query).
    pub fn replace(&self, records: Vec<T>, total: Option<u64>, has_more: Option<bool>) {
        let mut inner = self.inner.write();
        let merged = self.merge_batch(&inner.tombstones, records);
        inner.index = self.build_index(&merged);
        inner.records = merged;
        inner.total = total.unwrap_or(inner.records.len() as u64);
        let fresh = self.derive_has_more(&inner, has_more);
        inner.has_more = fresh;
    }

    /// Appends a page, updating colliding keys in place and pushing new
    /// keys to the tail in arrival order.
    pub fn append(&self, records: Vec<T>, total: Option<u64>, has_more: Option<bool>) {
        let mut inner = self.inner.write();
        for record in records {
            let key = (self.key_of)(&record);
            if inner.tombstones.contains(&key) {
                continue;
            }
            if let Some(&pos) = inner.index.get(&key) {
                inner.records[pos] = record;
            } else {
                inner.records.push(record);
                let pos = inner.records.len() - 1;
                inner.index.insert(key, pos);
            }
        }
        if let Some(total) = total {
            inner.total = total;
        }
        let proposed = self.derive_has_more(&inner, has_more);
        Self::apply_has_more(&mut inner, proposed, "append");
    }

    /// Replaces the first `window` entries by position, preserving the
    /// appended tail.
    ///
    /// Tail entries whose keys appear in the new head are dropped: a record
    /// may legitimately move from a later page into page 1 between polls,
    /// and key uniqueness outranks tail preservation.
    pub fn replace_head(
        &self,
        records: Vec<T>,
        window: usize,
        total: Option<u64>,
        has_more: Option<bool>,
    ) {
        let mut inner = self.inner.write();
        let head = self.merge_batch(&inner.tombstones, records);
        let head_keys: HashSet<String> = head.iter().map(|r| (self.key_of)(r)).collect();

        let tail = if inner.records.len() > window {
            inner.records[window..]
                .iter()
                .filter(|r| !head_keys.contains(&(self.key_of)(r)))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let mut merged = head;
        merged.extend(tail);
        inner.index = self.build_index(&merged);
        inner.records = merged;
        if let Some(total) = total {
            inner.total = total;
        }
        let proposed = self.derive_has_more(&inner, has_more);
        Self::apply_has_more(&mut inner, proposed, "replace_head");
    }

    /// Applies a synchronous local patch to the record with `key`.
    /// Returns `false` if the key is not present.
    pub fn patch_one(&self, key: &str, patch: impl FnOnce(&mut T)) -> bool {
        let mut inner = self.inner.write();
        match inner.index.get(key).copied() {
            Some(pos) => {
                patch(&mut inner.records[pos]);
                true
            }
            None => false,
        }
    }

    /// Removes the record with `key`, tombstoning it for the rest of this
    /// query lifetime and decrementing `total` (clamped at zero).
    /// Returns `false` if the key is not present.
    pub fn remove_one(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(pos) = inner.index.get(key).copied() else {
            return false;
        };
        inner.records.remove(pos);
        inner.tombstones.insert(key.to_string());
        let reindexed = self.build_index(&inner.records);
        inner.index = reindexed;
        inner.total = inner.total.saturating_sub(1);
        if self.policy == HasMorePolicy::FromTotal {
            let proposed = (inner.records.len() as u64) < inner.total;
            Self::apply_has_more(&mut inner, proposed, "remove_one");
        }
        true
    }

    /// Point-in-time copy of records and aggregate metadata.
    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot<T> {
        let inner = self.inner.read();
        ListSnapshot {
            records: inner.records.clone(),
            total: inner.total,
            has_more: inner.has_more,
        }
    }

    /// Whether any record satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.inner.read().records.iter().any(predicate)
    }

    /// Keys of all records, in display order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.read();
        inner.records.iter().map(|r| (self.key_of)(r)).collect()
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Latest known total across all pages.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.read().total
    }

    /// Whether more pages can be fetched.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.inner.read().has_more
    }

    /// De-duplicates a batch by key (later occurrence wins, keeping the
    /// earlier position) and drops tombstoned keys.
    fn merge_batch(&self, tombstones: &HashSet<String>, records: Vec<T>) -> Vec<T> {
        let mut merged: Vec<T> = Vec::with_capacity(records.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for record in records {
            let key = (self.key_of)(&record);
            if tombstones.contains(&key) {
                continue;
            }
            if let Some(&pos) = positions.get(&key) {
                merged[pos] = record;
            } else {
                positions.insert(key, merged.len());
                merged.push(record);
            }
        }
        merged
    }

    fn build_index(&self, records: &[T]) -> HashMap<String, usize> {
        records
            .iter()
            .enumerate()
            .map(|(pos, r)| ((self.key_of)(r), pos))
            .collect()
    }

    fn derive_has_more(&self, inner: &StoreInner<T>, reported: Option<bool>) -> bool {
        match self.policy {
            HasMorePolicy::FromTotal => (inner.records.len() as u64) < inner.total,
            HasMorePolicy::ServerReported => reported.unwrap_or(false),
        }
    }

    fn apply_has_more(inner: &mut StoreInner<T>, proposed: bool, op: &str) {
        if proposed && !inner.has_more {
            warn!(op, "has_more regressed from false to true; keeping false");
            return;
        }
        inner.has_more = proposed;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        id: String,
        rev: u32,
    }

    fn rec(id: &str, rev: u32) -> Rec {
        Rec { id: id.to_string(), rev }
    }

    fn store(policy: HasMorePolicy) -> RecordStore<Rec> {
        RecordStore::new(Arc::new(|r: &Rec| r.id.clone()), policy)
    }

    fn ids(store: &RecordStore<Rec>) -> Vec<String> {
        store.keys()
    }

    #[test]
    fn replace_swaps_full_list() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 1)], Some(10), None);
        s.replace(vec![rec("c", 1)], Some(5), None);

        assert_eq!(ids(&s), vec!["c"]);
        assert_eq!(s.total(), 5);
        assert!(s.has_more());
    }

    #[test]
    fn append_deduplicates_and_updates_in_place() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 1)], Some(4), None);
        s.append(vec![rec("b", 2), rec("c", 1)], Some(4), None);

        // "b" keeps its original position but carries the newer revision.
        assert_eq!(ids(&s), vec!["a", "b", "c"]);
        let snap = s.snapshot();
        assert_eq!(snap.records[1], rec("b", 2));
        assert!(s.has_more());

        s.append(vec![rec("d", 1)], Some(4), None);
        assert!(!s.has_more());
    }

    #[test]
    fn in_batch_duplicates_later_wins_earlier_position() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 1), rec("a", 2)], Some(2), None);
        assert_eq!(ids(&s), vec!["a", "b"]);
        assert_eq!(s.snapshot().records[0], rec("a", 2));
    }

    #[test]
    fn from_total_reconstructs_has_more() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1)], Some(3), Some(false));
        // The server flag is ignored under FromTotal; 1 < 3 means more.
        assert!(s.has_more());
    }

    #[test]
    fn server_reported_uses_flag_directly() {
        let s = store(HasMorePolicy::ServerReported);
        s.replace(vec![rec("a", 1)], None, Some(true));
        assert!(s.has_more());
        // Totals may be absent on token-paginated endpoints.
        assert_eq!(s.total(), 1);

        s.append(vec![rec("b", 1)], None, Some(false));
        assert!(!s.has_more());
    }

    #[test]
    fn has_more_never_regresses_to_true() {
        let s = store(HasMorePolicy::ServerReported);
        s.replace(vec![rec("a", 1)], Some(2), Some(true));
        s.append(vec![rec("b", 1)], Some(2), Some(false));
        assert!(!s.has_more());

        // A lagging page-1 refresh claims more data exists; clamp.
        s.replace_head(vec![rec("a", 2)], 1, Some(2), Some(true));
        assert!(!s.has_more());

        s.append(vec![rec("c", 1)], Some(3), Some(true));
        assert!(!s.has_more());
    }

    #[test]
    fn replace_head_preserves_tail() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 1)], Some(4), None);
        s.append(vec![rec("c", 1), rec("d", 1)], Some(4), None);

        s.replace_head(vec![rec("a", 2), rec("e", 1)], 2, Some(4), None);

        assert_eq!(ids(&s), vec!["a", "e", "c", "d"]);
        assert_eq!(s.snapshot().records[0], rec("a", 2));
    }

    #[test]
    fn replace_head_drops_tail_collisions() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 1)], Some(4), None);
        s.append(vec![rec("c", 1), rec("d", 1)], Some(4), None);

        // "c" moved from the tail into page 1 between polls.
        s.replace_head(vec![rec("c", 2), rec("a", 1)], 2, Some(4), None);

        assert_eq!(ids(&s), vec!["c", "a", "d"]);
        assert_eq!(s.snapshot().records[0], rec("c", 2));
    }

    #[test]
    fn replace_head_wider_than_store_replaces_everything() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1)], Some(1), None);
        s.replace_head(vec![rec("b", 1)], 10, Some(1), None);
        assert_eq!(ids(&s), vec!["b"]);
    }

    #[test]
    fn patch_one_edits_in_place() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 1)], Some(2), None);

        assert!(s.patch_one("b", |r| r.rev = 9));
        assert_eq!(s.snapshot().records[1], rec("b", 9));
        assert!(!s.patch_one("missing", |r| r.rev = 0));
    }

    #[test]
    fn remove_one_decrements_total_and_tombstones() {
        let s = store(HasMorePolicy::FromTotal);
        let records: Vec<Rec> = (0..10).map(|i| rec(&format!("r{i}"), 1)).collect();
        s.replace(records, Some(50), None);

        assert!(s.remove_one("r3"));
        assert_eq!(s.len(), 9);
        assert_eq!(s.total(), 49);

        // A lagging response that still contains the key cannot bring it back.
        s.append(vec![rec("r3", 2), rec("r10", 1)], Some(49), None);
        assert!(!ids(&s).contains(&"r3".to_string()));
        assert!(ids(&s).contains(&"r10".to_string()));

        s.replace_head(vec![rec("r3", 2), rec("r0", 2)], 2, Some(49), None);
        assert!(!ids(&s).contains(&"r3".to_string()));
    }

    #[test]
    fn remove_one_missing_key_is_noop() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1)], Some(1), None);
        assert!(!s.remove_one("b"));
        assert_eq!(s.len(), 1);
        assert_eq!(s.total(), 1);
    }

    #[test]
    fn total_clamps_at_zero() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1)], Some(0), None);
        assert!(s.remove_one("a"));
        assert_eq!(s.total(), 0);
    }

    #[test]
    fn clear_starts_a_new_query_lifetime() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1)], Some(2), None);
        s.remove_one("a");

        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.total(), 0);
        assert!(!s.has_more());

        // Tombstones do not leak across queries.
        s.replace(vec![rec("a", 2)], Some(1), None);
        assert_eq!(ids(&s), vec!["a"]);
    }

    #[test]
    fn any_matches_predicate() {
        let s = store(HasMorePolicy::FromTotal);
        s.replace(vec![rec("a", 1), rec("b", 7)], Some(2), None);
        assert!(s.any(|r| r.rev == 7));
        assert!(!s.any(|r| r.rev == 8));
    }

    // --- Property: keys stay unique under arbitrary mutation sequences ---

    #[derive(Debug, Clone)]
    enum Op {
        Replace(Vec<u8>),
        Append(Vec<u8>),
        ReplaceHead(Vec<u8>, usize),
        Remove(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let batch = proptest::collection::vec(0u8..12, 0..8);
        prop_oneof![
            batch.clone().prop_map(Op::Replace),
            batch.clone().prop_map(Op::Append),
            (batch, 0usize..6).prop_map(|(b, w)| Op::ReplaceHead(b, w)),
            (0u8..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn keys_never_duplicate(ops in proptest::collection::vec(op_strategy(), 1..24)) {
            let s = store(HasMorePolicy::FromTotal);
            for op in ops {
                match op {
                    Op::Replace(keys) => {
                        let batch = keys.iter().map(|k| rec(&format!("k{k}"), 1)).collect();
                        s.replace(batch, Some(100), None);
                    }
                    Op::Append(keys) => {
                        let batch = keys.iter().map(|k| rec(&format!("k{k}"), 2)).collect();
                        s.append(batch, Some(100), None);
                    }
                    Op::ReplaceHead(keys, window) => {
                        let batch = keys.iter().map(|k| rec(&format!("k{k}"), 3)).collect();
                        s.replace_head(batch, window, Some(100), None);
                    }
                    Op::Remove(k) => {
                        s.remove_one(&format!("k{k}"));
                    }
                }
                let keys = s.keys();
                let unique: HashSet<&String> = keys.iter().collect();
                prop_assert_eq!(unique.len(), keys.len());
            }
        }
    }
}
