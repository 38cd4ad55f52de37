pub mod ids;
pub mod project;
pub mod task;
pub mod time_log;
pub mod user;
