use diesel::prelude::*;
use diesel::sql_types::{Timestamptz, Varchar};

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::lock::Lease;
use crate::domain::ports::LockStore;
use crate::schema::scheduler_locks;

use super::models::LockRow;

/// Insert the lease, or take over an existing row only if it has expired.
/// Postgres holds the row lock across the conflict check and the update, so
/// two callers racing for one expired lease cannot both see a row count of 1.
const UPSERT_IF_ABSENT_OR_EXPIRED: &str = "\
INSERT INTO scheduler_locks (lock_name, locked_at, expires_at) \
VALUES ($1, $2, $3) \
ON CONFLICT (lock_name) DO UPDATE \
SET locked_at = EXCLUDED.locked_at, expires_at = EXCLUDED.expires_at \
WHERE scheduler_locks.expires_at < EXCLUDED.locked_at";

pub struct DieselLockStore {
    pool: DbPool,
}

impl DieselLockStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl LockStore for DieselLockStore {
    fn find_by_name(&self, lock_name: &str) -> Result<Option<Lease>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = scheduler_locks::table
            .find(lock_name)
            .select(LockRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Lease::from))
    }

    fn upsert_if_absent_or_expired(&self, lease: &Lease) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let written = diesel::sql_query(UPSERT_IF_ABSENT_OR_EXPIRED)
            .bind::<Varchar, _>(lease.lock_name.as_str())
            .bind::<Timestamptz, _>(lease.locked_at)
            .bind::<Timestamptz, _>(lease.expires_at)
            .execute(&mut conn)?;
        Ok(written == 1)
    }

    fn delete_by_name(&self, lock_name: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(scheduler_locks::table.find(lock_name)).execute(&mut conn)?;
        Ok(())
    }
}
