pub mod db;
mod jobs;
pub mod models;
mod nodes;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use jobs::JobCounts;
pub use tables::*;
