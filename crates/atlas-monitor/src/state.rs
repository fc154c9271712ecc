use atlas_core::{Block, CacheEntry, Envelope, Peer, Transaction};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Unanswered history requests remembered for attribution. Past this, the
/// oldest is treated as lost.
pub const MAX_PENDING_HISTORY: usize = 4;

/// Transaction history for one cache entry. `key` is the entry the history
/// was attributed to when it arrived, which is `None` only for an
/// unrequested response with nothing selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub key: Option<String>,
    pub transactions: Vec<Transaction>,
}

/// Canonical client-side view of the node.
///
/// History responses carry no key, so requested keys are queued in send
/// order and each response is attributed to the oldest outstanding one.
/// That only holds while the node answers in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    pub chain: Vec<Block>,
    pub peers: Vec<Peer>,
    pub cache: Vec<CacheEntry>,
    pub history: History,
    /// Running log fed by the legacy `transactions` push. Kept apart from
    /// per-key history.
    pub legacy_log: Vec<Transaction>,
    selected_key: Option<String>,
    pending_history: VecDeque<String>,
}

impl StateStore {
    pub fn apply(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Chain(blocks) => {
                self.chain = blocks;
            }
            Envelope::Block(block) => {
                self.chain.push(block);
            }
            Envelope::Peers(peers) => {
                self.peers = peers;
            }
            Envelope::Cache(entries) => {
                self.cache = entries;
            }
            Envelope::History(mut transactions) => {
                transactions.sort_by_key(|tx| tx.timestamp);
                let key = match self.pending_history.pop_front() {
                    Some(key) => Some(key),
                    None => {
                        debug!(
                            event = "history_unrequested",
                            selected = self.selected_key.as_deref().unwrap_or("")
                        );
                        self.selected_key.clone()
                    }
                };
                self.history = History { key, transactions };
            }
            Envelope::Transactions(transaction) => {
                self.legacy_log.push(transaction);
            }
            Envelope::Unknown { tag } => {
                debug!(event = "envelope_ignored", tag = %tag);
            }
        }
    }

    #[cfg(test)]
    pub fn reduce(mut self, envelope: Envelope) -> Self {
        self.apply(envelope);
        self
    }

    /// Records that a history request for `key` went out on the wire.
    pub fn expect_history(&mut self, key: &str) {
        if self.pending_history.len() >= MAX_PENDING_HISTORY {
            if let Some(stale) = self.pending_history.pop_front() {
                warn!(
                    event = "history_request_forgotten",
                    key = %stale,
                    pending = MAX_PENDING_HISTORY
                );
            }
        }
        self.pending_history.push_back(key.to_string());
    }

    pub fn select(&mut self, key: Option<&str>) {
        self.selected_key = key.map(str::to_string);
    }

    #[cfg(test)]
    pub fn selected_key(&self) -> Option<&str> {
        self.selected_key.as_deref()
    }

    pub fn history_for(&self, key: &str) -> Option<&[Transaction]> {
        match self.history.key.as_deref() {
            Some(held) if held == key => Some(&self.history.transactions),
            _ => None,
        }
    }

    pub fn history_pending(&self, key: &str) -> bool {
        self.pending_history.iter().any(|pending| pending == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::Operation;

    fn block(root: &str, prev: &str, timestamp: u64) -> Block {
        Block {
            merkle_root: root.to_string(),
            previous_hash: prev.to_string(),
            timestamp,
            transactions: Vec::new(),
            transaction_count: 0,
        }
    }

    fn tx(client_id: u64, timestamp: u64) -> Transaction {
        Transaction {
            client_id,
            data_name: "alpha".to_string(),
            operation: Operation::Set,
            timestamp,
        }
    }

    fn entry(name: &str) -> CacheEntry {
        CacheEntry {
            name: name.to_string(),
            size: 1,
            last_updated: 0,
            last_accessed: 0,
            transaction_count: 0,
        }
    }

    #[test]
    fn chain_snapshot_is_idempotent() {
        let snapshot = Envelope::Chain(vec![block("b0", "", 1), block("b1", "b0", 2)]);
        let once = StateStore::default().reduce(snapshot.clone());
        let twice = once.clone().reduce(snapshot);
        assert_eq!(once.chain, twice.chain);
        assert_eq!(twice.chain.len(), 2);
    }

    #[test]
    fn block_events_append_in_arrival_order() {
        let store = StateStore::default()
            .reduce(Envelope::Chain(vec![block("b0", "", 1)]))
            .reduce(Envelope::Block(block("b1", "b0", 2)))
            .reduce(Envelope::Block(block("b2", "b1", 3)));
        let roots: Vec<&str> = store.chain.iter().map(|b| b.merkle_root.as_str()).collect();
        assert_eq!(roots, vec!["b0", "b1", "b2"]);
    }

    #[test]
    fn chain_snapshot_replaces_appended_blocks() {
        let store = StateStore::default()
            .reduce(Envelope::Block(block("stray", "", 9)))
            .reduce(Envelope::Chain(vec![block("b0", "", 1)]));
        assert_eq!(store.chain, vec![block("b0", "", 1)]);
    }

    #[test]
    fn history_is_sorted_by_timestamp_and_stable_on_ties() {
        let mut store = StateStore::default();
        store.expect_history("alpha");
        store.apply(Envelope::History(vec![tx(1, 5), tx(2, 1), tx(3, 3), tx(4, 1)]));

        let order: Vec<(u64, u64)> = store
            .history
            .transactions
            .iter()
            .map(|t| (t.timestamp, t.client_id))
            .collect();
        assert_eq!(order, vec![(1, 2), (1, 4), (3, 3), (5, 1)]);
        assert_eq!(store.history.key.as_deref(), Some("alpha"));
    }

    #[test]
    fn history_responses_are_attributed_in_request_order() {
        let mut store = StateStore::default();
        store.expect_history("alpha");
        store.expect_history("beta");
        store.select(Some("beta"));
        assert!(store.history_pending("alpha"));

        store.apply(Envelope::History(vec![tx(1, 1)]));
        assert!(store.history_for("alpha").is_some());
        assert!(store.history_for("beta").is_none());

        store.apply(Envelope::History(vec![tx(2, 2), tx(3, 3)]));
        assert_eq!(store.history_for("beta").map(|h| h.len()), Some(2));
        assert!(!store.history_pending("beta"));
    }

    #[test]
    fn lost_history_answers_only_skew_attribution_up_to_the_cap() {
        let mut store = StateStore::default();
        for _ in 0..10 {
            store.expect_history("alpha");
        }
        store.expect_history("beta");
        store.select(Some("beta"));
        assert_eq!(store.pending_history.len(), MAX_PENDING_HISTORY);

        for _ in 0..MAX_PENDING_HISTORY - 1 {
            store.apply(Envelope::History(vec![tx(1, 1)]));
            assert!(store.history_for("beta").is_none());
        }
        store.apply(Envelope::History(vec![tx(2, 2), tx(3, 3)]));
        assert_eq!(store.history_for("beta").map(|h| h.len()), Some(2));
        assert!(!store.history_pending("beta"));
        assert!(store.pending_history.is_empty());
    }

    #[test]
    fn unrequested_history_falls_back_to_selection() {
        let mut store = StateStore::default();
        store.apply(Envelope::History(vec![tx(1, 1)]));
        assert_eq!(store.history.key, None);

        store.select(Some("gamma"));
        store.apply(Envelope::History(vec![tx(2, 2)]));
        assert_eq!(store.history_for("gamma").map(|h| h.len()), Some(1));
    }

    #[test]
    fn snapshots_replace_peers_and_cache_wholesale() {
        let store = StateStore::default()
            .reduce(Envelope::Cache(vec![entry("a"), entry("b")]))
            .reduce(Envelope::Cache(vec![entry("c")]))
            .reduce(Envelope::Peers(vec![Peer(serde_json::json!("p1"))]));
        assert_eq!(store.cache, vec![entry("c")]);
        assert!(!store.cache.iter().any(|entry| entry.name == "a"));
        assert_eq!(store.peers.len(), 1);
    }

    #[test]
    fn legacy_transactions_append_without_touching_history() {
        let mut store = StateStore::default();
        store.expect_history("alpha");
        store.apply(Envelope::History(vec![tx(1, 1)]));
        store.apply(Envelope::Transactions(tx(2, 9)));
        store.apply(Envelope::Transactions(tx(3, 4)));

        assert_eq!(store.history.transactions, vec![tx(1, 1)]);
        let clients: Vec<u64> = store.legacy_log.iter().map(|t| t.client_id).collect();
        assert_eq!(clients, vec![2, 3]);
    }

    #[test]
    fn unknown_envelope_leaves_state_unchanged() {
        let before = StateStore::default().reduce(Envelope::Chain(vec![block("b0", "", 1)]));
        let after = before.clone().reduce(Envelope::Unknown {
            tag: "mempool".to_string(),
        });
        assert_eq!(before, after);
    }
}
