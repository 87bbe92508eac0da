//! Local note store: a SQLite-backed canonical list of notes with a
//! searchable projection and a reconciler for list gestures.

pub mod config;
pub mod db;
pub mod errors;
pub mod notes;

pub use config::config;
pub use db::{open_db, LazyDb, DB};
pub use errors::{Error, Result};
