//! Reconciliation of retry-attempt limits.
//!
//! Two independently failing subsystems count authentication attempts: the
//! step policy (local per-operation failure budget) and the external
//! credential verifier (its own lockout counter). The tighter limit always
//! wins, and callers must surface the reconciled value to the user, never
//! either raw counter.

/// Resolve the number of remaining authentication attempts.
///
/// Returns `None` (no limit) iff both inputs are `None`; otherwise the
/// smaller of the two non-`None` values, treating a `None` input as "no
/// constraint from that source". The function is commutative.
#[must_use]
pub const fn resolve_remaining_attempts(
    verifier_attempts: Option<u32>,
    policy_attempts: Option<u32>,
) -> Option<u32> {
    match (verifier_attempts, policy_attempts) {
        (None, None) => None,
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (Some(a), Some(b)) => {
            if a < b {
                Some(a)
            } else {
                Some(b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limit_from_either_source() {
        assert_eq!(resolve_remaining_attempts(None, None), None);
    }

    #[test]
    fn test_single_source_wins() {
        assert_eq!(resolve_remaining_attempts(Some(3), None), Some(3));
        assert_eq!(resolve_remaining_attempts(None, Some(4)), Some(4));
    }

    #[test]
    fn test_tighter_limit_wins() {
        assert_eq!(resolve_remaining_attempts(Some(5), Some(2)), Some(2));
        assert_eq!(resolve_remaining_attempts(Some(1), Some(9)), Some(1));
    }

    #[test]
    fn test_commutative() {
        let pairs = [
            (None, None),
            (Some(0), None),
            (None, Some(7)),
            (Some(3), Some(3)),
            (Some(2), Some(8)),
        ];
        for (a, b) in pairs {
            assert_eq!(
                resolve_remaining_attempts(a, b),
                resolve_remaining_attempts(b, a)
            );
        }
    }
}
