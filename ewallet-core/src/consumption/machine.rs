//! Merge rules for consumption snapshots.
//!
//! Every update, whether it arrived as a socket event or as the response of
//! an approve/reject call, goes through [`merge`]. The function is pure: it
//! only looks at the local snapshot, the update, an optional event kind and
//! the time to record for transitions that carry no timestamp.

use ewallet_sdk::objects::socket::SocketEventKind;
use ewallet_sdk::objects::TransactionConsumption;
use ewallet_sdk::objects::TransactionConsumptionStatus as Status;
use time::OffsetDateTime;

/// Why an update left the snapshot untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The local snapshot already reached a terminal status.
    Terminal,
    /// The update is for another consumption.
    IdMismatch,
    /// The update is behind the local snapshot.
    Stale,
    /// Neither the update nor its event kind names a known status.
    UnknownStatus,
    /// The lifecycle does not allow the move.
    Illegal,
    /// Same status and nothing new to fill in.
    Duplicate,
}

/// Outcome of merging one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status moved forward.
    Advanced { from: Status, to: Status },
    /// A same-stage status was replaced by a later decision
    /// (`approved` by a later `rejected`, or the reverse).
    Replaced { from: Status, to: Status },
    /// Same status; missing fields were filled in.
    Merged,
    Ignored(IgnoreReason),
}

impl Transition {
    /// Returns `true` if the snapshot was modified.
    pub fn changed(&self) -> bool {
        !matches!(self, Transition::Ignored(_))
    }
}

/// Status the update asks for: its own, or the one implied by the event
/// kind when the server sent a status this build does not know.
pub fn target_status(update: &TransactionConsumption, hint: Option<&SocketEventKind>) -> Status {
    if update.status != Status::Unknown {
        return update.status;
    }
    match hint {
        Some(SocketEventKind::ConsumptionRequest) => Status::Pending,
        Some(SocketEventKind::ConsumptionApproved) => Status::Approved,
        Some(SocketEventKind::ConsumptionRejected) => Status::Rejected,
        Some(SocketEventKind::ConsumptionExpired) => Status::Expired,
        // `finalized` covers confirmed, failed and rejected alike.
        _ => Status::Unknown,
    }
}

/// Merge `update` into `current`.
pub fn merge(
    current: &mut TransactionConsumption,
    update: &TransactionConsumption,
    hint: Option<&SocketEventKind>,
    now: OffsetDateTime,
) -> Transition {
    if current.id != update.id {
        return Transition::Ignored(IgnoreReason::IdMismatch);
    }
    if current.status.is_terminal() {
        return Transition::Ignored(IgnoreReason::Terminal);
    }

    let target = target_status(update, hint);
    let Some(target_stage) = target.stage() else {
        return Transition::Ignored(IgnoreReason::UnknownStatus);
    };
    let from = current.status;

    // A snapshot that itself decoded as `unknown` accepts any known status.
    let Some(current_stage) = from.stage() else {
        apply(current, update, target, now);
        return Transition::Advanced { from, to: target };
    };

    if target_stage > current_stage {
        if !from.can_transition_to(target) {
            return Transition::Ignored(IgnoreReason::Illegal);
        }
        apply(current, update, target, now);
        return Transition::Advanced { from, to: target };
    }
    if target_stage < current_stage {
        return Transition::Ignored(IgnoreReason::Stale);
    }

    if target == from {
        return if fill_missing(current, update) {
            Transition::Merged
        } else {
            Transition::Ignored(IgnoreReason::Duplicate)
        };
    }

    // Same stage, different decision: the strictly later one wins, outside
    // of `can_transition_to`.
    let Some(update_at) = update.timestamp_for(target) else {
        return Transition::Ignored(IgnoreReason::Stale);
    };
    if current.timestamp_for(from).is_some_and(|current_at| update_at <= current_at) {
        return Transition::Ignored(IgnoreReason::Stale);
    }
    apply(current, update, target, now);
    Transition::Replaced { from, to: target }
}

/// Adopt the server snapshot as the new local state at `target`.
fn apply(
    current: &mut TransactionConsumption,
    update: &TransactionConsumption,
    target: Status,
    now: OffsetDateTime,
) {
    let created_at = current.created_at;
    let approved_at = current.approved_at.or(update.approved_at);

    *current = update.clone();
    current.status = target;
    current.created_at = created_at;
    current.approved_at = match target {
        Status::Approved | Status::Confirmed | Status::Failed | Status::Expired => approved_at,
        _ => None,
    };

    for status in [Status::Rejected, Status::Confirmed, Status::Failed, Status::Expired] {
        if status != target
            && let Some(slot) = current.timestamp_slot(status)
        {
            *slot = None;
        }
    }
    let at = update.timestamp_for(target).unwrap_or(now);
    if let Some(slot) = current.timestamp_slot(target)
        && slot.is_none()
    {
        *slot = Some(at);
    }

    if target != Status::Confirmed {
        current.finalized_request_amount = None;
        current.finalized_consumption_amount = None;
    }
}

/// Copy fields the update has and the snapshot lacks. Returns `true` if
/// anything was copied.
fn fill_missing(current: &mut TransactionConsumption, update: &TransactionConsumption) -> bool {
    fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) -> bool {
        if slot.is_none() && value.is_some() {
            slot.clone_from(value);
            true
        } else {
            false
        }
    }

    let status = current.status;
    let mut changed = false;
    changed |= fill(&mut current.amount, &update.amount);
    changed |= fill(&mut current.correlation_id, &update.correlation_id);
    changed |= fill(&mut current.idempotency_token, &update.idempotency_token);
    changed |= fill(&mut current.user_id, &update.user_id);
    changed |= fill(&mut current.account_id, &update.account_id);
    changed |= fill(&mut current.expiration_date, &update.expiration_date);
    changed |= fill(&mut current.transaction, &update.transaction);
    if let Some(slot) = current.timestamp_slot(status) {
        changed |= fill(slot, &update.timestamp_for(status));
    }
    if current.metadata.is_empty() && !update.metadata.is_empty() {
        current.metadata = update.metadata.clone();
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn consumption(status: &str, extra: serde_json::Value) -> TransactionConsumption {
        let mut value = json!({
            "id": "txc_01",
            "status": status,
            "estimated_request_amount": "100",
            "estimated_consumption_amount": "100",
            "token": {"id": "tok_OMG", "symbol": "OMG", "name": "OmiseGO", "subunit_to_unit": 100},
            "address": "addr_01",
            "transaction_request_id": "txr_01",
            "socket_topic": "transaction_consumption:txc_01",
            "created_at": "2018-05-01T10:00:00Z"
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    const NOW: OffsetDateTime = datetime!(2018-05-01 12:00 UTC);

    #[test]
    fn test_pending_to_approved_uses_update_timestamp() {
        let mut local = consumption("pending", json!({}));
        let update = consumption("approved", json!({"approved_at": "2018-05-01T10:01:00Z"}));

        let outcome = merge(&mut local, &update, None, NOW);
        assert_eq!(
            outcome,
            Transition::Advanced {
                from: Status::Pending,
                to: Status::Approved
            }
        );
        assert_eq!(local.approved_at, Some(datetime!(2018-05-01 10:01 UTC)));
        assert!(local.is_consistent());
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_now() {
        let mut local = consumption("pending", json!({}));
        let update = consumption("expired", json!({}));

        merge(&mut local, &update, None, NOW);
        assert_eq!(local.status, Status::Expired);
        assert_eq!(local.expired_at, Some(NOW));
    }

    #[test]
    fn test_terminal_ignores_everything() {
        let mut local = consumption("confirmed", json!({"confirmed_at": "2018-05-01T10:02:00Z"}));
        for status in ["pending", "approved", "rejected", "failed", "expired", "confirmed"] {
            let update = consumption(status, json!({"rejected_at": "2018-05-01T11:00:00Z"}));
            assert_eq!(
                merge(&mut local, &update, None, NOW),
                Transition::Ignored(IgnoreReason::Terminal)
            );
        }
        assert_eq!(local.status, Status::Confirmed);
        assert_eq!(local.rejected_at, None);
    }

    #[test]
    fn test_other_id_is_ignored() {
        let mut local = consumption("pending", json!({}));
        let update = consumption("approved", json!({"id": "txc_02"}));
        assert_eq!(
            merge(&mut local, &update, None, NOW),
            Transition::Ignored(IgnoreReason::IdMismatch)
        );
        assert_eq!(local.status, Status::Pending);
    }

    #[test]
    fn test_unknown_status_uses_event_kind() {
        let mut local = consumption("pending", json!({}));
        let update = consumption("on_hold", json!({}));
        assert_eq!(update.status, Status::Unknown);

        assert_eq!(
            merge(&mut local, &update, None, NOW),
            Transition::Ignored(IgnoreReason::UnknownStatus)
        );
        let outcome = merge(
            &mut local,
            &update,
            Some(&SocketEventKind::ConsumptionApproved),
            NOW,
        );
        assert!(outcome.changed());
        assert_eq!(local.status, Status::Approved);
        assert_eq!(local.approved_at, Some(NOW));
    }

    #[test]
    fn test_lower_stage_is_stale() {
        let mut local = consumption("approved", json!({"approved_at": "2018-05-01T10:01:00Z"}));
        let update = consumption("pending", json!({}));
        assert_eq!(
            merge(&mut local, &update, None, NOW),
            Transition::Ignored(IgnoreReason::Stale)
        );
    }

    #[test]
    fn test_approved_at_survives_confirmation() {
        let mut local = consumption("approved", json!({"approved_at": "2018-05-01T10:01:00Z"}));
        let update = consumption(
            "confirmed",
            json!({
                "confirmed_at": "2018-05-01T10:02:00Z",
                "finalized_request_amount": "100",
                "finalized_consumption_amount": "100"
            }),
        );

        merge(&mut local, &update, None, NOW);
        assert_eq!(local.status, Status::Confirmed);
        assert_eq!(local.approved_at, Some(datetime!(2018-05-01 10:01 UTC)));
        assert_eq!(local.confirmed_at, Some(datetime!(2018-05-01 10:02 UTC)));
        assert!(local.finalized_request_amount.is_some());
        assert!(local.is_consistent());
    }

    #[test]
    fn test_failed_drops_finalized_amounts() {
        let mut local = consumption("approved", json!({"approved_at": "2018-05-01T10:01:00Z"}));
        let update = consumption(
            "failed",
            json!({"failed_at": "2018-05-01T10:02:00Z", "finalized_request_amount": "100"}),
        );
        merge(&mut local, &update, None, NOW);
        assert_eq!(local.status, Status::Failed);
        assert_eq!(local.finalized_request_amount, None);
    }

    #[test]
    fn test_later_decision_replaces_earlier() {
        // Not a forward lifecycle move, but reconciliation still allows it.
        assert!(!Status::Approved.can_transition_to(Status::Rejected));
        let mut local = consumption("approved", json!({"approved_at": "2018-05-01T10:01:00Z"}));

        let earlier = consumption("rejected", json!({"rejected_at": "2018-05-01T10:00:30Z"}));
        assert_eq!(
            merge(&mut local, &earlier, None, NOW),
            Transition::Ignored(IgnoreReason::Stale)
        );

        let later = consumption("rejected", json!({"rejected_at": "2018-05-01T10:05:00Z"}));
        assert_eq!(
            merge(&mut local, &later, None, NOW),
            Transition::Replaced {
                from: Status::Approved,
                to: Status::Rejected
            }
        );
        assert_eq!(local.approved_at, None);
        assert!(local.is_consistent());
    }

    #[test]
    fn test_same_status_fills_missing_fields() {
        let mut local = consumption("approved", json!({"approved_at": "2018-05-01T10:01:00Z"}));
        let update = consumption(
            "approved",
            json!({"approved_at": "2018-05-01T10:09:00Z", "correlation_id": "order-7"}),
        );

        assert_eq!(merge(&mut local, &update, None, NOW), Transition::Merged);
        assert_eq!(local.correlation_id.as_deref(), Some("order-7"));
        assert_eq!(local.approved_at, Some(datetime!(2018-05-01 10:01 UTC)));

        assert_eq!(
            merge(&mut local, &update, None, NOW),
            Transition::Ignored(IgnoreReason::Duplicate)
        );
    }
}
