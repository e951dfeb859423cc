pub mod database;
/// XHTML loading for the extraction pass.
pub mod document;
/// Rendering of the generated C++ header.
pub mod header;

pub use database::{CheckStatus, Database, DatabaseEntry, DatabaseError};
pub use document::DocumentError;
