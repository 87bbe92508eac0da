mod image;
mod model;
mod persistence;
mod reconciler;
mod search;
mod store;

pub use image::{Image, ImageRef, ImageStorage};
pub use model::{timestamp, Note, NoteDraft, NoteEdit, NoteId, Tags};
pub use persistence::{NotePersistence, SqliteNotes};
pub use reconciler::{Confirm, Edited, Editor, Outcome, Reconciler};
pub use search::Search;
pub use store::{NoteStore, Removed, Saved, Snapshot};
