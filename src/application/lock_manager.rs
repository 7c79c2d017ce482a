use chrono::{DateTime, Duration, Utc};

use crate::domain::errors::DomainError;
use crate::domain::lock::Lease;
use crate::domain::ports::LockStore;

/// Single-slot lease lock over a [`LockStore`].
///
/// There is no fencing token and `release` does not check ownership: any
/// caller that knows the name can release the lease.
pub struct LockManager<L> {
    store: L,
}

impl<L: LockStore> LockManager<L> {
    pub fn new(store: L) -> Self {
        Self { store }
    }

    /// Try to take `lock_name` for `lease_secs` seconds. Never blocks or
    /// retries; `false` means an unexpired lease is held elsewhere.
    pub fn acquire(&self, lock_name: &str, lease_secs: u32) -> Result<bool, DomainError> {
        self.acquire_at(lock_name, lease_secs, Utc::now())
    }

    pub fn acquire_at(
        &self,
        lock_name: &str,
        lease_secs: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let lease = Lease::starting_at(lock_name, now, Duration::seconds(i64::from(lease_secs)));

        if self.store.upsert_if_absent_or_expired(&lease)? {
            log::info!(
                "Acquired lock '{}' until {}",
                lock_name,
                lease.expires_at
            );
            return Ok(true);
        }

        match self.store.find_by_name(lock_name)? {
            Some(held) => log::info!(
                "Lock '{}' is still active until {}",
                lock_name,
                held.expires_at
            ),
            None => log::info!("Lock '{}' was contended and released meanwhile", lock_name),
        }
        Ok(false)
    }

    /// Remove the lease unconditionally. Releasing an absent lease is a no-op.
    pub fn release(&self, lock_name: &str) -> Result<(), DomainError> {
        self.store.delete_by_name(lock_name)?;
        log::info!("Released lock '{}'", lock_name);
        Ok(())
    }

    pub fn current_lease(&self, lock_name: &str) -> Result<Option<Lease>, DomainError> {
        self.store.find_by_name(lock_name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::LockManager;
    use crate::infrastructure::memory::MemoryLockStore;

    const NAME: &str = "order-processing-lock";

    fn manager() -> LockManager<MemoryLockStore> {
        LockManager::new(MemoryLockStore::new())
    }

    #[test]
    fn acquire_creates_a_lease_of_the_requested_length() {
        let locks = manager();
        let now = Utc::now();

        assert!(locks.acquire_at(NAME, 300, now).expect("acquire failed"));

        let lease = locks
            .current_lease(NAME)
            .expect("lookup failed")
            .expect("lease should exist");
        assert_eq!(lease.locked_at, now);
        assert_eq!(lease.expires_at, now + Duration::seconds(300));
    }

    #[test]
    fn unexpired_lease_blocks_a_second_acquire() {
        let locks = manager();
        let now = Utc::now();

        assert!(locks.acquire_at(NAME, 300, now).unwrap());
        assert!(!locks
            .acquire_at(NAME, 300, now + Duration::seconds(299))
            .unwrap());
        assert!(!locks
            .acquire_at(NAME, 300, now + Duration::seconds(300))
            .unwrap());

        let lease = locks.current_lease(NAME).unwrap().unwrap();
        assert_eq!(lease.locked_at, now, "the held lease must be untouched");
    }

    #[test]
    fn expired_lease_is_taken_over() {
        let locks = manager();
        let now = Utc::now();
        assert!(locks.acquire_at(NAME, 300, now).unwrap());

        let later = now + Duration::seconds(301);
        assert!(locks.acquire_at(NAME, 300, later).unwrap());

        let lease = locks.current_lease(NAME).unwrap().unwrap();
        assert_eq!(lease.locked_at, later);
        assert_eq!(lease.expires_at, later + Duration::seconds(300));
    }

    #[test]
    fn distinct_names_do_not_contend() {
        let locks = manager();
        assert!(locks.acquire(NAME, 300).unwrap());
        assert!(locks.acquire("report-lock", 300).unwrap());
    }

    #[test]
    fn release_frees_the_name_and_is_idempotent() {
        let locks = manager();
        assert!(locks.acquire(NAME, 300).unwrap());

        locks.release(NAME).expect("release failed");
        locks.release(NAME).expect("second release failed");

        assert!(locks.current_lease(NAME).unwrap().is_none());
        assert!(locks.acquire(NAME, 300).unwrap());
    }
}
