use std::time::{Duration, Instant};

/// A session is only considered usable while more than this is left of the lease
pub(crate) const LEASE_GUARD: Duration = Duration::from_secs(5);
/// Login is skipped while more than this is left of the lease
pub(crate) const LOGIN_REUSE: Duration = Duration::from_secs(300);

/// The token of the HTTP API and how long it is valid
///
/// Token and lease are always set and cleared together.
#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    token: Option<String>,
    lease: Option<Instant>,
}

impl Session {
    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn lease(&self) -> Option<Instant> {
        self.lease
    }

    pub(crate) fn set(&mut self, token: String, lease_time: Duration, now: Instant) {
        self.token = Some(token);
        self.lease = Some(now + lease_time);
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
        self.lease = None;
    }

    /// Moves the lease into the past so that the next command logs in again
    pub(crate) fn expire(&mut self, now: Instant) {
        if self.lease.is_some() {
            self.lease = Some(now.checked_sub(LEASE_GUARD).unwrap_or(now));
        }
    }

    fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.token.as_ref()?;
        self.lease?.checked_duration_since(now)
    }

    pub(crate) fn is_active_at(&self, now: Instant) -> bool {
        matches!(self.remaining_at(now), Some(left) if left > LEASE_GUARD)
    }

    /// True while login can be skipped
    pub(crate) fn is_reusable_at(&self, now: Instant) -> bool {
        matches!(self.remaining_at(now), Some(left) if left > LOGIN_REUSE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_window() {
        let now = Instant::now();
        let mut session = Session::default();
        assert!(!session.is_active_at(now));

        session.set("abc".to_string(), Duration::from_secs(3600), now);
        assert!(session.is_active_at(now));
        assert!(session.is_reusable_at(now));
        assert!(!session.is_reusable_at(now + Duration::from_secs(3400)));
        assert!(session.is_active_at(now + Duration::from_secs(3594)));
        assert!(!session.is_active_at(now + Duration::from_secs(3595)));
    }

    #[test]
    fn test_expire() {
        let now = Instant::now();
        let mut session = Session::default();
        session.expire(now);
        assert!(session.lease().is_none());

        session.set("abc".to_string(), Duration::from_secs(3600), now);
        session.expire(now);
        assert!(!session.is_active_at(now));
        // The token stays so that the next login can log it out
        assert_eq!(session.token(), Some("abc"));

        session.clear();
        assert!(session.token().is_none());
        assert!(session.lease().is_none());
    }
}
