//! Local database for imported profiles and proxy selections.

pub mod models;
pub mod schema;

pub use models::{ProfileRecord, ProfileType, Selection};
pub use schema::Database;
