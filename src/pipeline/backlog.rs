//! In-memory backlog of normalized, not-yet-announced transactions
//!
//! Not persisted: a crash loses pending entries, but anything already
//! announced is in the ledger, so nothing is announced twice because of it.
//! Entries leave the queue only after they were announced.

use super::types::TransactionRecord;

#[derive(Debug, Default)]
pub struct BacklogQueue {
    entries: Vec<TransactionRecord>,
}

impl BacklogQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record at the tail
    pub fn append(&mut self, record: TransactionRecord) {
        log::debug!("📥 Queued {} ({})", record.tx_id, record.display_name);
        self.entries.push(record);
    }

    /// Drop announced entries, preserving the order of the rest.
    /// Returns how many were removed.
    pub fn prune_announced(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|record| !record.is_announced());
        before - self.entries.len()
    }

    /// True iff an un-announced entry is waiting
    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|record| !record.is_announced())
    }

    /// Most recently appended un-announced entry.
    ///
    /// Newest-first: during a burst the latest sale goes out first and the
    /// older entries wait for later cycles.
    pub fn select_next(&mut self) -> Option<&mut TransactionRecord> {
        self.entries
            .iter_mut()
            .rev()
            .find(|record| !record.is_announced())
    }

    /// True iff a record for `tx_id` is queued (announced or not)
    pub fn contains(&self, tx_id: &str) -> bool {
        self.entries.iter().any(|record| record.tx_id == tx_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(tx_id: &str) -> TransactionRecord {
        TransactionRecord::new(
            tx_id.to_string(),
            format!("Asset {}", tx_id),
            None,
            Decimal::ONE,
            Decimal::ONE,
            format!("https://market.example/{}", tx_id),
            1,
        )
    }

    fn queued_ids(queue: &BacklogQueue) -> Vec<String> {
        queue.iter().map(|r| r.tx_id.clone()).collect()
    }

    #[test]
    fn test_select_next_is_most_recent() {
        let mut queue = BacklogQueue::new();
        queue.append(record("A"));
        queue.append(record("B"));
        queue.append(record("C"));

        let next = queue.select_next().unwrap();
        assert_eq!(next.tx_id, "C");
        next.mark_announced();

        assert_eq!(queue.prune_announced(), 1);
        assert_eq!(queue.select_next().unwrap().tx_id, "B");
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut queue = BacklogQueue::new();
        queue.append(record("A"));
        queue.append(record("B"));
        queue.append(record("C"));
        queue.select_next().unwrap().mark_announced();

        assert_eq!(queue.prune_announced(), 1);
        let after_first = queued_ids(&queue);

        assert_eq!(queue.prune_announced(), 0);
        assert_eq!(queue.prune_announced(), 0);
        assert_eq!(queued_ids(&queue), after_first);
        assert_eq!(after_first, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_prune_removes_announced_from_middle() {
        let mut queue = BacklogQueue::new();
        queue.append(record("A"));
        queue.append(record("B"));
        queue.append(record("C"));

        for entry in queue.entries.iter_mut() {
            if entry.tx_id == "B" {
                entry.mark_announced();
            }
        }

        queue.prune_announced();
        assert_eq!(queued_ids(&queue), vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = BacklogQueue::new();
        assert!(!queue.has_pending());
        assert!(queue.select_next().is_none());
        assert_eq!(queue.prune_announced(), 0);
    }

    #[test]
    fn test_unannounced_candidate_stays_selected() {
        let mut queue = BacklogQueue::new();
        queue.append(record("A"));
        queue.append(record("B"));

        assert_eq!(queue.select_next().unwrap().tx_id, "B");
        // Publish failed: nothing flipped
        queue.prune_announced();
        assert!(queue.has_pending());
        assert_eq!(queue.select_next().unwrap().tx_id, "B");
        assert!(queue.contains("A"));
    }
}
