//! Anti-forgery `state` tokens for interactive authorization attempts
//!
//! Each caller session holds at most one outstanding attempt. Verifying an
//! attempt always consumes it, so a state token is accepted at most once.

use crate::types::AuthorizationAttempt;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use dashmap::DashMap;
use rand::{rngs::OsRng, Rng};
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Default lifetime of an outstanding attempt
pub const DEFAULT_ATTEMPT_TTL: Duration = Duration::from_secs(15 * 60);

/// Random bytes per state token (256 bits)
const STATE_TOKEN_BYTES: usize = 32;

/// Tracks outstanding authorization attempts keyed by session id
pub struct StateTracker {
    attempts: DashMap<String, AuthorizationAttempt>,
    ttl: chrono::Duration,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TTL)
    }
}

impl StateTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Start a new attempt for `session_id`, superseding any previous one
    pub fn begin(&self, session_id: &str) -> String {
        self.purge_expired();

        let state_token = generate_state_token();
        let attempt = AuthorizationAttempt {
            state_token: state_token.clone(),
            created_at: Utc::now(),
            session_id: session_id.to_string(),
        };

        if self
            .attempts
            .insert(session_id.to_string(), attempt)
            .is_some()
        {
            debug!(session_id, "Superseded previous authorization attempt");
        }

        state_token
    }

    /// Check `presented_state` against the session's outstanding attempt.
    ///
    /// The attempt is removed before comparison, whatever the outcome.
    pub fn verify(&self, session_id: &str, presented_state: &str) -> bool {
        let Some((_, attempt)) = self.attempts.remove(session_id) else {
            warn!(session_id, "No outstanding authorization attempt for session");
            return false;
        };

        if attempt.is_expired_at(self.ttl, Utc::now()) {
            warn!(session_id, "Authorization attempt expired");
            return false;
        }

        let matches = constant_time_eq(attempt.state_token.as_bytes(), presented_state.as_bytes());
        if !matches {
            warn!(session_id, "Presented state does not match outstanding attempt");
        }
        matches
    }

    /// Whether the session has an unexpired outstanding attempt
    pub fn is_pending(&self, session_id: &str) -> bool {
        self.attempts
            .get(session_id)
            .is_some_and(|attempt| !attempt.is_expired_at(self.ttl, Utc::now()))
    }

    /// Number of outstanding attempts, expired ones included until purged
    pub fn outstanding(&self) -> usize {
        self.attempts.len()
    }

    /// Drop expired attempts, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.attempts.len();
        self.attempts
            .retain(|_, attempt| !attempt.is_expired_at(self.ttl, now));
        let removed = before.saturating_sub(self.attempts.len());
        if removed > 0 {
            debug!(removed, "Purged expired authorization attempts");
        }
        removed
    }
}

/// URL-safe random state token from the operating system CSPRNG
fn generate_state_token() -> String {
    let bytes: [u8; STATE_TOKEN_BYTES] = OsRng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two byte strings without short-circuiting on the first mismatch
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_verify_is_one_time() {
        let tracker = StateTracker::default();
        let state = tracker.begin("s1");

        assert!(tracker.verify("s1", &state));
        assert!(!tracker.verify("s1", &state));
    }

    #[test]
    fn test_wrong_state_consumes_attempt() {
        let tracker = StateTracker::default();
        let state = tracker.begin("s1");

        assert!(!tracker.verify("s1", "wrong-state"));
        assert!(!tracker.verify("s1", &state));
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_state_is_bound_to_session() {
        let tracker = StateTracker::default();
        let state = tracker.begin("s1");

        assert!(!tracker.verify("s2", &state));
        assert!(tracker.verify("s1", &state));
    }

    #[test]
    fn test_new_attempt_supersedes_previous() {
        let tracker = StateTracker::default();
        let first = tracker.begin("s1");
        let second = tracker.begin("s1");

        assert_ne!(first, second);
        assert_eq!(tracker.outstanding(), 1);
        assert!(!tracker.verify("s1", &first));

        let third = tracker.begin("s1");
        assert!(tracker.verify("s1", &third));
    }

    #[test]
    fn test_expired_attempt_is_rejected() {
        let tracker = StateTracker::new(Duration::ZERO);
        let state = tracker.begin("s1");

        assert!(!tracker.is_pending("s1"));
        assert!(!tracker.verify("s1", &state));
    }

    #[test]
    fn test_purge_expired() {
        let tracker = StateTracker::new(Duration::ZERO);
        tracker.begin("s1");
        tracker.begin("s2");
        // begin() purges before inserting, so only the latest remains
        assert_eq!(tracker.outstanding(), 1);
        assert_eq!(tracker.purge_expired(), 1);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_state_token_format() {
        let token = generate_state_token();
        // 32 bytes -> 43 unpadded base64 characters
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded = URL_SAFE_NO_PAD.decode(&token).unwrap();
        assert_eq!(decoded.len(), STATE_TOKEN_BYTES);
    }

    #[test]
    fn test_state_tokens_are_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_state_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"diff"));
        assert!(!constant_time_eq(b"same", b"same-but-longer"));
        assert!(!constant_time_eq(b"", b"x"));
    }

    #[test]
    fn test_concurrent_verify_accepts_once() {
        let tracker = Arc::new(StateTracker::default());
        let state = tracker.begin("s1");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                let state = state.clone();
                std::thread::spawn(move || tracker.verify("s1", &state))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
    }

    /// Statistical timing check: comparing a wrong state that shares a long
    /// prefix with the real one should not take measurably longer than one
    /// that differs in the first byte.
    #[test]
    #[ignore]
    fn test_comparison_timing_independent_of_prefix() {
        use std::time::Instant;

        let secret = generate_state_token();
        let mut early = secret.clone().into_bytes();
        early[0] = if early[0] == b'A' { b'B' } else { b'A' };
        let mut late = secret.clone().into_bytes();
        let last = late.len() - 1;
        late[last] = if late[last] == b'A' { b'B' } else { b'A' };

        let rounds = 200_000;
        let measure = |candidate: &[u8]| {
            let start = Instant::now();
            for _ in 0..rounds {
                std::hint::black_box(constant_time_eq(
                    std::hint::black_box(secret.as_bytes()),
                    std::hint::black_box(candidate),
                ));
            }
            start.elapsed().as_nanos() as f64
        };

        let mut ratios = Vec::new();
        for _ in 0..5 {
            let early_ns = measure(&early);
            let late_ns = measure(&late);
            ratios.push(late_ns / early_ns);
        }
        ratios.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = ratios[ratios.len() / 2];
        assert!(
            (0.8..1.25).contains(&median),
            "comparison time depends on matching prefix (ratio {median})"
        );
    }
}
