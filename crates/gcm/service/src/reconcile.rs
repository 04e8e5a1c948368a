//! Reconciliation of gateway replies.

use std::collections::HashMap;

use gcm_core::{
    FailureRule, InvalidIdError, Message, MessageStatus, ResponseChunk, StatusPolicy,
};
use gcm_storage::{DeviceFilter, DeviceStore};

use crate::mark_inactive;

/// A device deactivated because the gateway rejected its token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Deactivation {
    pub device_id: String,
    pub registration_token: String,
    pub error: InvalidIdError,
}

/// Fold one response chunk into `message` and deactivate rejected devices.
///
/// `rule` decides whether the chunk marks the message `FAILED` or `SENT`, and
/// `policy` how that folds into the status left by earlier chunks. Only
/// recipients whose error is one of [`InvalidIdError::ALL`] are deactivated.
pub fn post_send<S>(
    store: &S,
    message: &mut Message,
    chunk: &ResponseChunk,
    policy: StatusPolicy,
    rule: FailureRule,
) -> color_eyre::eyre::Result<Vec<Deactivation>>
where
    S: DeviceStore + ?Sized,
{
    if !chunk.result.is_failure(rule) {
        message.record_outcome(MessageStatus::Sent, policy);
        return Ok(Vec::new());
    }

    message.record_outcome(MessageStatus::Failed, policy);

    tracing::warn!(
        message_id = %message.id,
        error = ?chunk.result.error,
        failure = ?chunk.result.failure,
        recipients = chunk.recipients.len(),
        "gateway reported a failed chunk"
    );

    let invalid: HashMap<&str, InvalidIdError> = chunk
        .paired()?
        .into_iter()
        .filter_map(|(token, result)| result.invalid_id_error().map(|error| (token, error)))
        .collect();

    if invalid.is_empty() {
        return Ok(Vec::new());
    }

    let devices = store.filter_devices(&DeviceFilter::by_tokens(invalid.keys().copied()))?;

    let mut deactivated = Vec::with_capacity(devices.len());
    for mut device in devices {
        let Some(&error) = invalid.get(device.registration_token.as_str()) else {
            continue;
        };

        mark_inactive(store, &mut device, Some(error.as_str()))?;

        deactivated.push(Deactivation {
            device_id: device.device_id,
            registration_token: device.registration_token,
            error,
        });
    }

    Ok(deactivated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::chunk;
    use gcm_core::{Device, DispatchError};
    use gcm_storage::MemoryStorage;

    fn registry(devices: &[(&str, &str)]) -> MemoryStorage {
        let store = MemoryStorage::new();
        for (id, token) in devices {
            store
                .save_device(&Device::new(*id, *token).with_active(true))
                .unwrap();
        }
        store
    }

    fn is_active(store: &MemoryStorage, id: &str) -> bool {
        store.find_device(id).unwrap().unwrap().is_active
    }

    fn reconcile(
        store: &MemoryStorage,
        message: &mut Message,
        recipients: &[&str],
        body: serde_json::Value,
    ) -> color_eyre::eyre::Result<Vec<Deactivation>> {
        post_send(
            store,
            message,
            &chunk(recipients, body),
            StatusPolicy::LastChunkWins,
            FailureRule::KeyPresent,
        )
    }

    #[test]
    fn test_success_chunk_marks_sent() {
        let store = registry(&[("a", "t1")]);
        let mut message = Message::new();

        let deactivated = reconcile(
            &store,
            &mut message,
            &["t1"],
            serde_json::json!({"success": 1, "results": [{"message_id": "m1"}]}),
        )
        .unwrap();

        assert_eq!(message.status, MessageStatus::Sent);
        assert!(deactivated.is_empty());
        assert!(is_active(&store, "a"));
    }

    #[test]
    fn test_zero_failure_key_marks_failed() {
        let store = registry(&[("a", "t1")]);
        let mut message = Message::new();

        let deactivated = reconcile(
            &store,
            &mut message,
            &["t1"],
            serde_json::json!({"success": 1, "failure": 0, "results": [{"message_id": "m1"}]}),
        )
        .unwrap();

        assert_eq!(message.status, MessageStatus::Failed);
        assert!(deactivated.is_empty());
        assert!(is_active(&store, "a"));
    }

    #[test]
    fn test_null_error_key_marks_failed() {
        let store = registry(&[]);
        let mut message = Message::new();

        reconcile(&store, &mut message, &[], serde_json::json!({"error": null})).unwrap();

        assert_eq!(message.status, MessageStatus::Failed);
    }

    #[test]
    fn test_non_integer_failure_marks_failed() {
        let store = registry(&[]);
        let mut message = Message::new();

        reconcile(&store, &mut message, &[], serde_json::json!({"failure": true})).unwrap();

        assert_eq!(message.status, MessageStatus::Failed);
    }

    #[test]
    fn test_non_zero_rule_ignores_empty_indicators() {
        let store = registry(&[]);

        for body in [
            serde_json::json!({"success": 1, "failure": 0}),
            serde_json::json!({"error": null}),
        ] {
            let mut message = Message::new();
            post_send(
                &store,
                &mut message,
                &chunk(&[], body),
                StatusPolicy::LastChunkWins,
                FailureRule::NonZero,
            )
            .unwrap();
            assert_eq!(message.status, MessageStatus::Sent);
        }
    }

    #[test]
    fn test_every_invalid_code_deactivates() {
        let store = registry(&[("a", "t1"), ("b", "t2"), ("c", "t3"), ("d", "t4")]);
        let mut message = Message::new();

        let mut deactivated = reconcile(
            &store,
            &mut message,
            &["t1", "t2", "t3", "t4"],
            serde_json::json!({
                "failure": 3,
                "results": [
                    {"error": "InvalidRegistration"},
                    {"error": "NotRegistered"},
                    {"error": "MismatchSenderId"},
                    {"message_id": "m4"},
                ],
            }),
        )
        .unwrap();
        deactivated.sort_by(|a, b| a.device_id.cmp(&b.device_id));

        assert_eq!(message.status, MessageStatus::Failed);
        assert_eq!(
            deactivated,
            vec![
                Deactivation {
                    device_id: "a".to_string(),
                    registration_token: "t1".to_string(),
                    error: InvalidIdError::InvalidRegistration,
                },
                Deactivation {
                    device_id: "b".to_string(),
                    registration_token: "t2".to_string(),
                    error: InvalidIdError::NotRegistered,
                },
                Deactivation {
                    device_id: "c".to_string(),
                    registration_token: "t3".to_string(),
                    error: InvalidIdError::MismatchSenderId,
                },
            ]
        );
        assert!(!is_active(&store, "a"));
        assert!(!is_active(&store, "b"));
        assert!(!is_active(&store, "c"));
        assert!(is_active(&store, "d"));
    }

    #[test]
    fn test_transient_errors_leave_devices_alone() {
        let store = registry(&[("a", "t1"), ("b", "t2")]);
        let mut message = Message::new();

        let deactivated = reconcile(
            &store,
            &mut message,
            &["t1", "t2"],
            serde_json::json!({
                "failure": 2,
                "results": [{"error": "Unavailable"}, {"error": "InternalServerError"}],
            }),
        )
        .unwrap();

        assert_eq!(message.status, MessageStatus::Failed);
        assert!(deactivated.is_empty());
        assert!(is_active(&store, "a"));
        assert!(is_active(&store, "b"));
    }

    #[test]
    fn test_unregistered_tokens_are_skipped() {
        let store = registry(&[("a", "t1")]);
        let mut message = Message::new();

        let deactivated = reconcile(
            &store,
            &mut message,
            &["unknown"],
            serde_json::json!({"failure": 1, "results": [{"error": "NotRegistered"}]}),
        )
        .unwrap();

        assert!(deactivated.is_empty());
        assert!(is_active(&store, "a"));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let store = registry(&[("a", "t1"), ("b", "t2")]);
        let mut message = Message::new();

        let err = reconcile(
            &store,
            &mut message,
            &["t1", "t2"],
            serde_json::json!({"failure": 1, "results": [{"error": "NotRegistered"}]}),
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<DispatchError>(),
            Some(&DispatchError::MalformedResponse {
                recipients: 2,
                results: 1,
            })
        );
        assert!(is_active(&store, "a"));
        assert!(is_active(&store, "b"));
    }

    #[test]
    fn test_policy_decides_late_success() {
        let store = registry(&[]);
        let failed = chunk(&[], serde_json::json!({"error": "TopicsMessageRateExceeded"}));
        let sent = chunk(&[], serde_json::json!({"message_id": 1}));
        let rule = FailureRule::KeyPresent;

        let mut last_wins = Message::new();
        for c in [&failed, &sent] {
            post_send(&store, &mut last_wins, c, StatusPolicy::LastChunkWins, rule).unwrap();
        }
        assert_eq!(last_wins.status, MessageStatus::Sent);

        let mut any_failure = Message::new();
        for c in [&failed, &sent] {
            post_send(&store, &mut any_failure, c, StatusPolicy::AnyFailureWins, rule).unwrap();
        }
        assert_eq!(any_failure.status, MessageStatus::Failed);
    }
}
