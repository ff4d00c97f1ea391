pub mod employees;
pub mod files;
pub mod health;

pub use employees::{employees_get, employees_sql_get};
pub use files::file_raw_get;
pub use health::{health, root};
