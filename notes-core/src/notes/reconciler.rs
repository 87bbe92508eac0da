//! Turns position-based list gestures into identity-based store calls.
//!
//! Positions come from the filtered projection the user is looking at, so
//! they are resolved to a [`NoteId`] against that projection first and never
//! used to index the canonical list.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use async_trait::async_trait;

use crate::{Error, Result};

use super::{
    model::{Note, NoteDraft, NoteId},
    persistence::NotePersistence,
    search::Search,
    store::{NoteStore, Removed, Saved},
};

/// Yes/no prompt shown before a destructive action.
#[async_trait]
pub trait Confirm: Send + Sync {
    /// `None` when the prompt was dismissed without an answer.
    async fn confirm_delete(&self, note: &Note) -> Option<bool>;
}

/// Editing surface for a new or existing note.
#[async_trait]
pub trait Editor: Send + Sync {
    /// `None` when the user backed out.
    async fn edit(&self, existing: Option<Note>) -> Option<Edited>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edited {
    Draft(NoteDraft),
    Revision(Note),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Note),
    Saved(Saved),
    Deleted(Removed),
    /// Deletion was not confirmed; the view should put the item back.
    Restored(NoteId),
    /// The editor closed without a result.
    Cancelled,
    /// Another interaction is still running; nothing was done.
    Busy,
}

pub struct Reconciler<P, C, E> {
    store: Arc<NoteStore<P>>,
    confirm: C,
    editor: E,
    search: Mutex<Search>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P, C, E> Reconciler<P, C, E>
where
    P: NotePersistence,
    C: Confirm,
    E: Editor,
{
    pub fn new(store: Arc<NoteStore<P>>, confirm: C, editor: E) -> Self {
        Self {
            store,
            confirm,
            editor,
            search: Mutex::new(Search::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<NoteStore<P>> {
        &self.store
    }

    /// Returns `false` when the trimmed query is unchanged and the view can stay as is.
    pub fn set_query(&self, raw: &str) -> bool {
        self.search().set_query(raw)
    }

    pub fn query(&self) -> String {
        self.search().query().to_string()
    }

    /// The projection the user sees, in canonical order.
    pub fn visible(&self) -> Vec<Note> {
        let search = self.search().clone();
        self.store.search(&search)
    }

    /// Identity of the note shown at `position` in the current projection.
    pub fn resolve(&self, position: usize) -> Result<NoteId> {
        let search = self.search().clone();
        let notes = self.store.notes();

        search
            .apply(&notes)
            .get(position)
            .map(|note| note.id())
            .ok_or_else(|| Error::NotFound(format!("no note at position {position}")))
    }

    /// Swipe-to-delete on the item at `position`; removes only after an explicit yes.
    pub async fn delete_at(&self, position: usize) -> Result<Outcome> {
        let Some(_guard) = self.begin() else {
            return Ok(Outcome::Busy);
        };

        let id = self.resolve(position)?;
        let note = self.current(id)?;

        match self.confirm.confirm_delete(&note).await {
            Some(true) => {
                let removed = self.store.remove(id).await?;
                Ok(Outcome::Deleted(removed))
            }
            answer => {
                tracing::debug!(%id, ?answer, "delete not confirmed");
                Ok(Outcome::Restored(id))
            }
        }
    }

    /// Opens the editor on the note at `position`, looked up by identity.
    pub async fn edit_at(&self, position: usize) -> Result<Outcome> {
        let Some(_guard) = self.begin() else {
            return Ok(Outcome::Busy);
        };

        let id = self.resolve(position)?;
        let note = self.current(id)?;

        self.apply_edit(Some(note)).await
    }

    /// Opens the editor for a new note.
    pub async fn compose(&self) -> Result<Outcome> {
        let Some(_guard) = self.begin() else {
            return Ok(Outcome::Busy);
        };

        self.apply_edit(None).await
    }

    async fn apply_edit(&self, existing: Option<Note>) -> Result<Outcome> {
        match self.editor.edit(existing).await {
            Some(Edited::Draft(draft)) => Ok(Outcome::Created(self.store.create(draft).await?)),
            Some(Edited::Revision(note)) => Ok(Outcome::Saved(self.store.save(note).await?)),
            None => Ok(Outcome::Cancelled),
        }
    }

    fn current(&self, id: NoteId) -> Result<Note> {
        self.store
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("note {id} is gone")))
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    fn search(&self) -> std::sync::MutexGuard<'_, Search> {
        self.search.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
