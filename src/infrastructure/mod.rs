pub mod lock_repo;
pub mod models;
pub mod order_repo;

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub mod test_db;
