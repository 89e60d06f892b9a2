pub mod manager;
pub mod models;
pub mod query;

pub use manager::{DatabaseError, DatabaseManager};
pub use query::{Page, PageError};
