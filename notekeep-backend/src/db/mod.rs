pub mod error;
pub mod fts;
pub mod schema;
pub mod sqlite;
pub mod tables;

pub use error::{ErrorKind, NoteError, NoteResult};
pub use sqlite::Database;
