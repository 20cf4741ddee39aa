pub mod candidates;
pub mod error;
pub mod gbrt;
pub mod grid;
pub mod http_cache;
pub mod http_client;
pub mod predict;
pub mod report;
pub mod sector_profile;
pub mod session_fetch;
pub mod session_store;
