pub mod admin;
pub mod attendance;
pub mod catalog;
pub mod core;
pub mod reports;
pub mod students;
pub mod templates;
pub mod timetable;
