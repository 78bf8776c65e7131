pub mod assignments;
pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod images;
pub mod rubrics;
pub mod stats;
pub mod students;
pub mod submissions;
