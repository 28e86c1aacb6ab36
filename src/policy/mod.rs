// Policy module for Threshold Recovery Node
//
// The dead-man switch itself: a two-state machine derived from the wallet's
// last activity and the clock at request time. Nothing is scheduled and no
// state field is stored, so every request observes a self-consistent answer
// and there is no ticker to race against.

use crate::error::{RecoveryNodeError, Result};
use crate::types::{StatusResponse, Wallet};

/// Derived lifecycle state of a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Owner has proven liveness recently; shares stay locked
    Active,
    /// Liveness lapsed; shares may be released to authorised callers
    Recoverable,
}

/// Whether the switch has tripped at `now`.
///
/// The predicate is inclusive: a wallet checked at exactly
/// `last_activity + inactivity_threshold` is recoverable. Once true it stays
/// true until a successful liveness update, since both operands only move
/// forward.
pub fn is_recoverable(wallet: &Wallet, now: u64) -> bool {
    let deadline = wallet.last_activity.saturating_add(wallet.inactivity_threshold);
    now >= deadline || now >= wallet.expiration_date
}

/// Derive the wallet state at `now`
pub fn state(wallet: &Wallet, now: u64) -> RecoveryState {
    if is_recoverable(wallet, now) {
        RecoveryState::Recoverable
    } else {
        RecoveryState::Active
    }
}

/// Seconds until the switch trips; non-positive means already tripped
pub fn time_until_recovery(wallet: &Wallet, now: u64) -> i64 {
    let deadline = wallet.last_activity.saturating_add(wallet.inactivity_threshold);
    deadline as i64 - now as i64
}

/// Build the owner-facing status view
pub fn status(wallet: &Wallet, now: u64) -> StatusResponse {
    StatusResponse {
        recoverable: is_recoverable(wallet, now),
        last_activity: wallet.last_activity,
        time_until_recovery: time_until_recovery(wallet, now),
    }
}

/// Gate a share release (mailbox pickup or the node's own share).
///
/// While the owner is live the caller gets the remaining wait time so it can
/// poll status instead of hammering the gate.
pub fn check_release_allowed(wallet: &Wallet, now: u64) -> Result<()> {
    if is_recoverable(wallet, now) {
        return Ok(());
    }

    Err(RecoveryNodeError::RecoveryLocked {
        last_activity: wallet.last_activity,
        time_until_recovery: time_until_recovery(wallet, now),
    })
}

/// Look up the caller's mailbox slot on the wallet.
///
/// A miss is `NotAFriend`, distinct from `NotFound`, so shareholders can
/// diagnose a wrong key without learning anything about other slots.
pub fn find_friend_share<'a>(wallet: &'a Wallet, slot: &str) -> Result<&'a [u8]> {
    wallet
        .friend_shares
        .get(slot)
        .map(|blob| blob.as_slice())
        .ok_or_else(|| {
            RecoveryNodeError::NotAFriend("caller holds no mailbox slot on this wallet".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn wallet(last_activity: u64, threshold: u64) -> Wallet {
        Wallet {
            id: "test".to_string(),
            public_key: vec![4u8; 65],
            server_share: vec![],
            server_share_index: 1,
            commitment: vec![],
            threshold: 2,
            inactivity_threshold: threshold,
            last_activity,
            expiration_date: last_activity + threshold,
            friend_shares: HashMap::new(),
        }
    }

    #[test]
    fn test_recoverable_boundary_is_inclusive() {
        let w = wallet(1_000, 30);

        assert!(!is_recoverable(&w, 1_029));
        assert!(is_recoverable(&w, 1_030));
        assert!(is_recoverable(&w, 1_031));
    }

    #[test]
    fn test_recoverable_is_monotone_in_time() {
        let w = wallet(1_000, 60);

        let mut tripped = false;
        for now in 1_000..1_200 {
            let r = is_recoverable(&w, now);
            assert!(r >= tripped, "recoverable flipped back at t={}", now);
            tripped = r;
        }
        assert!(tripped);
    }

    #[test]
    fn test_liveness_update_pushes_deadline() {
        let mut w = wallet(1_000, 10);
        assert!(is_recoverable(&w, 1_015));

        // A successful liveness at t=1008 makes the wallet active again
        w.last_activity = 1_008;
        w.expiration_date = 1_008 + 10;

        assert!(!is_recoverable(&w, 1_015));
        assert!(is_recoverable(&w, 1_018));
    }

    #[test]
    fn test_expiration_date_is_an_independent_deadline() {
        let mut w = wallet(1_000, 100);
        w.expiration_date = 1_020;

        assert!(is_recoverable(&w, 1_020));
        assert!(!is_recoverable(&w, 1_019));
    }

    #[test]
    fn test_time_until_recovery_goes_negative() {
        let w = wallet(1_000, 30);

        assert_eq!(time_until_recovery(&w, 1_010), 20);
        assert_eq!(time_until_recovery(&w, 1_030), 0);
        assert_eq!(time_until_recovery(&w, 1_045), -15);
    }

    #[test]
    fn test_release_gate_reports_wait_time() {
        let w = wallet(1_000, 30);

        match check_release_allowed(&w, 1_010) {
            Err(RecoveryNodeError::RecoveryLocked {
                last_activity,
                time_until_recovery,
            }) => {
                assert_eq!(last_activity, 1_000);
                assert_eq!(time_until_recovery, 20);
            }
            other => panic!("expected RecoveryLocked, got {:?}", other),
        }

        assert!(check_release_allowed(&w, 1_030).is_ok());
    }

    #[test]
    fn test_friend_lookup_distinguishes_miss() {
        let mut w = wallet(1_000, 30);
        w.friend_shares.insert("slot-a".to_string(), vec![1, 2, 3]);

        assert_eq!(find_friend_share(&w, "slot-a").unwrap(), &[1, 2, 3]);
        assert!(matches!(
            find_friend_share(&w, "slot-b"),
            Err(RecoveryNodeError::NotAFriend(_))
        ));
    }
}
