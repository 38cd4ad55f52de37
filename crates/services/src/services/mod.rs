pub mod config;
pub mod password;
pub mod rate_limit;
pub mod summary;
