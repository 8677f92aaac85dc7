pub mod cache;
pub mod leads;
pub mod manager;
pub mod master;
pub mod users;

pub use manager::{DatabaseError, DatabaseManager};
