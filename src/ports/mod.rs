//! Port traits the domain depends on.

pub mod config_port;
pub mod data_port;
pub mod store_port;
