pub mod accounts;
pub mod bounded;
pub mod bulletin;
pub mod codec;
pub mod config;
pub mod errors;
pub mod finance;
pub mod password;
pub mod portal;
pub mod rest_api;
pub mod schedule;
pub mod store;
pub mod table_models;
