pub mod catalog;
pub mod collector;
pub mod error;
pub mod pickup;
pub mod rewards;
pub mod roles;
pub mod service;
pub mod store;
pub mod utils;
