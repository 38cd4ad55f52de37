pub mod checklist_item;
pub mod project;
pub mod project_member;
pub mod task;
pub mod time_log;
pub mod user;
