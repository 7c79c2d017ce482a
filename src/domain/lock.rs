use chrono::{DateTime, Duration, Utc};

/// A time-bounded exclusive claim on a named resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub lock_name: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn starting_at(lock_name: &str, now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            lock_name: lock_name.to_string(),
            locked_at: now,
            expires_at: now + duration,
        }
    }

    /// A lease is still valid up to and including `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
