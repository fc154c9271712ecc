use crate::state::StateStore;
use atlas_core::{decode_envelope, Envelope, FrameError, DEFAULT_MAX_FRAME_BYTES};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied { tag: String },
    Ignored { tag: String },
    Rejected(FrameError),
}

/// Decodes one inbound frame and reduces it into `store`. A frame that
/// fails to decode is logged and dropped; the store is not touched.
pub fn route_frame(store: &mut StateStore, frame: &str) -> RouteOutcome {
    match decode_envelope(frame, DEFAULT_MAX_FRAME_BYTES) {
        Ok(envelope) => {
            let tag = envelope.tag().to_string();
            let known = !matches!(envelope, Envelope::Unknown { .. });
            store.apply(envelope);
            if known {
                RouteOutcome::Applied { tag }
            } else {
                RouteOutcome::Ignored { tag }
            }
        }
        Err(err) => {
            warn!(event = "frame_rejected", bytes = frame.len(), error = %err);
            RouteOutcome::Rejected(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_json(root: &str) -> serde_json::Value {
        json!({
            "merkle_root": root,
            "previous_hash": "",
            "timestamp": 1,
            "transactions": [],
            "transaction_count": 0
        })
    }

    #[test]
    fn frames_are_reduced_in_order() {
        let mut store = StateStore::default();
        let frames = [
            json!({"type": "chain", "value": [block_json("b0")]}),
            json!({"type": "block", "value": block_json("b1")}),
            json!({"type": "block", "value": block_json("b2")}),
        ];
        for frame in frames {
            let outcome = route_frame(&mut store, &frame.to_string());
            assert!(matches!(outcome, RouteOutcome::Applied { .. }));
        }
        let roots: Vec<&str> = store.chain.iter().map(|b| b.merkle_root.as_str()).collect();
        assert_eq!(roots, vec!["b0", "b1", "b2"]);
    }

    #[test]
    fn history_frame_is_displayed_sorted() {
        let mut store = StateStore::default();
        store.expect_history("alpha");
        let frame = json!({
            "type": "history",
            "value": [
                {"client_id": 1, "data_name": "alpha", "operation": "set", "timestamp": 5},
                {"client_id": 1, "data_name": "alpha", "operation": "get", "timestamp": 1},
                {"client_id": 1, "data_name": "alpha", "operation": "get", "timestamp": 3}
            ]
        });
        route_frame(&mut store, &frame.to_string());
        let stamps: Vec<u64> = store
            .history_for("alpha")
            .unwrap_or_default()
            .iter()
            .map(|tx| tx.timestamp)
            .collect();
        assert_eq!(stamps, vec![1, 3, 5]);
    }

    #[test]
    fn unknown_tag_is_ignored() {
        let mut store = StateStore::default();
        let outcome = route_frame(&mut store, r#"{"type":"mempool","value":[1,2]}"#);
        assert_eq!(
            outcome,
            RouteOutcome::Ignored {
                tag: "mempool".to_string()
            }
        );
        assert_eq!(store, StateStore::default());
    }

    #[test]
    fn malformed_frames_leave_state_unchanged() {
        let mut store = StateStore::default();
        route_frame(
            &mut store,
            &json!({"type": "chain", "value": [block_json("b0")]}).to_string(),
        );
        let before = store.clone();

        for frame in [
            "not json",
            r#"{"type":"block","value":{"merkle_root":7}}"#,
            r#"{"value":[]}"#,
        ] {
            let outcome = route_frame(&mut store, frame);
            assert!(matches!(outcome, RouteOutcome::Rejected(_)), "frame: {frame}");
        }
        assert_eq!(store, before);
    }
}
