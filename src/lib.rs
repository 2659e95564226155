pub mod api;
pub mod client;
pub mod codes;
pub mod persistence;
pub mod store;
pub mod types;
