pub mod errors;
pub mod lock;
pub mod order;
pub mod ports;
pub mod status;
