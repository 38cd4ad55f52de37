pub mod health;
pub mod logs;
pub mod projects;
pub mod summary;
pub mod tasks;
pub mod users;
