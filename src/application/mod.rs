pub mod lock_manager;
pub mod order_service;
pub mod scheduler;
