use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::Result;

use super::{
    model::{Note, NoteDraft, NoteId},
    persistence::NotePersistence,
    search::Search,
};

/// Immutable view of the canonical list at one point in time.
pub type Snapshot = Arc<Vec<Note>>;

/// Result of [`NoteStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub note: Note,
    /// The backing store had a row with this id.
    pub stored: bool,
    /// The canonical list had an entry with this id. It is replaced only
    /// when `stored` is also set.
    pub listed: bool,
}

/// Result of [`NoteStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed {
    pub id: NoteId,
    pub stored: bool,
    pub listed: bool,
}

impl Removed {
    pub fn existed(&self) -> bool {
        self.stored || self.listed
    }
}

/// Owner of the canonical note list.
///
/// Every mutation holds the list lock across its persistence call, so two
/// mutations never interleave their read-modify-write. Readers go through
/// the published [`Snapshot`] and never wait on a mutation.
pub struct NoteStore<P> {
    persistence: P,
    notes: Mutex<Vec<Note>>,
    changes: watch::Sender<Snapshot>,
}

impl<P: NotePersistence> NoteStore<P> {
    pub fn new(persistence: P) -> Self {
        let (changes, _) = watch::channel(Snapshot::default());

        Self {
            persistence,
            notes: Mutex::new(Vec::new()),
            changes,
        }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Replaces the canonical list with everything in the backing store.
    pub async fn load(&self) -> Result<usize> {
        let mut notes = self.notes.lock().await;

        let mut loaded = self.persistence.list_all().await?;
        sort(&mut loaded);
        *notes = loaded;

        tracing::debug!(count = notes.len(), "loaded notes");
        self.publish(&notes);
        Ok(notes.len())
    }

    /// Persists `draft` and adds the resulting note to the canonical list.
    ///
    /// On error the list is left as it was.
    pub async fn create(&self, draft: NoteDraft) -> Result<Note> {
        let mut notes = self.notes.lock().await;

        let id = self.persistence.insert(&draft).await?;
        let note = draft.into_note(id);

        notes.push(note.clone());
        sort(&mut notes);

        tracing::debug!(%id, "created note");
        self.publish(&notes);
        Ok(note)
    }

    /// Persists a new revision and swaps it in for the entry with the same id.
    ///
    /// The list only changes when the backing store had the row. A revision
    /// whose id is no longer listed (removed while being edited) is still
    /// written but not brought back into the list.
    pub async fn save(&self, note: Note) -> Result<Saved> {
        let mut notes = self.notes.lock().await;
        let id = note.id();

        let stored = self.persistence.update(&note).await?;

        let entry = notes.iter_mut().find(|n| n.id() == id);
        let listed = entry.is_some();

        match entry {
            Some(entry) if stored => {
                *entry = note.clone();
                sort(&mut notes);
                self.publish(&notes);
                tracing::debug!(%id, "saved note");
            }
            _ => tracing::warn!(%id, stored, listed, "saved note was not applied to the list"),
        }

        Ok(Saved { note, stored, listed })
    }

    /// Deletes by identity. Unknown ids are reported, not treated as errors.
    pub async fn remove(&self, id: NoteId) -> Result<Removed> {
        let mut notes = self.notes.lock().await;

        let stored = self.persistence.delete(id).await?;

        let len = notes.len();
        notes.retain(|n| n.id() != id);
        let listed = notes.len() != len;

        if listed {
            self.publish(&notes);
        }
        tracing::debug!(%id, stored, listed, "removed note");

        Ok(Removed { id, stored, listed })
    }

    /// Current canonical list, without waiting on an in-flight mutation.
    pub fn notes(&self) -> Snapshot {
        self.changes.borrow().clone()
    }

    pub fn get(&self, id: NoteId) -> Option<Note> {
        self.changes.borrow().iter().find(|n| n.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.changes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receives a new snapshot after every change to the canonical list.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.changes.subscribe()
    }

    pub fn search(&self, search: &Search) -> Vec<Note> {
        search.apply(&self.notes()).into_iter().cloned().collect()
    }

    fn publish(&self, notes: &[Note]) {
        self.changes.send_replace(Arc::new(notes.to_vec()));
    }
}

/// Most recently updated first; `sort_by` is stable, so ties keep insertion order.
fn sort(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        db::{init_test_db, LazyDb},
        notes::{model::fixtures::*, NoteEdit, SqliteNotes},
        Error,
    };

    pub async fn sqlite_store() -> Result<NoteStore<SqliteNotes>> {
        let db = init_test_db().await.map_err(Error::unavailable)?;
        Ok(NoteStore::new(SqliteNotes::new(LazyDb::ready(db))))
    }

    fn titles(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(Note::title).collect()
    }

    fn assert_sorted(notes: &[Note]) {
        assert!(notes.windows(2).all(|w| w[0].updated_at() >= w[1].updated_at()));
    }

    /// Wraps sqlite and fails every write while `fail_writes` is set.
    struct Flaky {
        inner: SqliteNotes,
        fail_writes: AtomicBool,
    }

    impl Flaky {
        fn check(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::write(rusqlite::Error::InvalidQuery));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NotePersistence for Flaky {
        async fn list_all(&self) -> Result<Vec<Note>> {
            self.inner.list_all().await
        }

        async fn insert(&self, draft: &NoteDraft) -> Result<NoteId> {
            self.check()?;
            self.inner.insert(draft).await
        }

        async fn update(&self, note: &Note) -> Result<bool> {
            self.check()?;
            self.inner.update(note).await
        }

        async fn delete(&self, id: NoteId) -> Result<bool> {
            self.check()?;
            self.inner.delete(id).await
        }
    }

    async fn flaky_store() -> Result<NoteStore<Flaky>> {
        let db = init_test_db().await.map_err(Error::unavailable)?;
        Ok(NoteStore::new(Flaky {
            inner: SqliteNotes::new(LazyDb::ready(db)),
            fail_writes: AtomicBool::new(false),
        }))
    }

    #[tokio::test]
    async fn newest_first() -> Result<()> {
        let store = sqlite_store().await?;

        store.create(draft("A", 1)).await?;
        store
            .create(draft("B", 2).with_tags(vec!["x".to_string()]))
            .await?;

        assert_eq!(titles(&store.notes()), vec!["B", "A"]);
        assert_eq!(titles(&store.persistence().list_all().await?), vec!["B", "A"]);
        Ok(())
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() -> Result<()> {
        let store = sqlite_store().await?;

        for title in ["first", "second", "third"] {
            store.create(draft(title, 5)).await?;
        }
        store.create(draft("older", 1)).await?;

        assert_eq!(titles(&store.notes()), vec!["first", "second", "third", "older"]);

        store.load().await?;
        assert_eq!(titles(&store.notes()), vec!["first", "second", "third", "older"]);
        Ok(())
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() -> Result<()> {
        let store = sqlite_store().await?;

        let a = store.create(draft("A", 1)).await?;
        let b = store.create(draft("B", 2)).await?;
        assert_ne!(a.id(), b.id());

        let fresh = store.persistence().list_all().await?;
        assert_eq!(fresh.iter().find(|n| n.id() == a.id()), Some(&a));
        assert_eq!(store.get(b.id()), Some(b));
        Ok(())
    }

    #[tokio::test]
    async fn load_replaces_the_list() -> Result<()> {
        let store = sqlite_store().await?;
        store.create(draft("A", 1)).await?;
        store.create(draft("B", 2)).await?;

        let other = NoteStore::new(SqliteNotes::new(LazyDb::ready(
            store.persistence().db().await?.clone(),
        )));
        assert!(other.is_empty());
        assert_eq!(other.load().await?, 2);
        assert_eq!(titles(&other.notes()), vec!["B", "A"]);
        Ok(())
    }

    #[tokio::test]
    async fn load_surfaces_unavailable_storage() {
        let store = NoteStore::new(SqliteNotes::new(LazyDb::new("/nonexistent/notes-core/notes.db")));

        let error = store.load().await.unwrap_err();
        assert!(error.is_storage_unavailable());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_one_entry_and_resorts() -> Result<()> {
        let store = sqlite_store().await?;
        let a = store.create(draft("A", 1)).await?;
        store.create(draft("B", 2)).await?;

        let revised = a
            .revise(
                NoteEdit {
                    body: Some("now newest".into()),
                    ..Default::default()
                },
                at(3),
            )
            .unwrap();
        let saved = store.save(revised.clone()).await?;

        assert!(saved.stored && saved.listed);
        assert_eq!(store.len(), 2);
        assert_eq!(store.notes()[0], revised);
        assert_eq!(titles(&store.notes()), vec!["A", "B"]);
        Ok(())
    }

    #[tokio::test]
    async fn save_of_unlisted_note_is_not_reinserted() -> Result<()> {
        let store = sqlite_store().await?;
        let a = store.create(draft("A", 1)).await?;
        store.create(draft("B", 2)).await?;

        // row exists, but this store instance no longer lists it
        let other = NoteStore::new(SqliteNotes::new(LazyDb::ready(
            store.persistence().db().await?.clone(),
        )));
        other.create(draft("C", 3)).await?;
        let before = other.notes();

        let revised = a.revise(NoteEdit::default(), at(4)).unwrap();
        let saved = other.save(revised.clone()).await?;

        assert!(saved.stored);
        assert!(!saved.listed);
        assert_eq!(other.notes(), before);
        assert!(other.persistence().list_all().await?.contains(&revised));
        Ok(())
    }

    #[tokio::test]
    async fn save_after_remove_is_a_reported_noop() -> Result<()> {
        let store = sqlite_store().await?;
        let a = store.create(draft("A", 1)).await?;
        store.remove(a.id()).await?;

        let saved = store.save(a.revise(NoteEdit::default(), at(2)).unwrap()).await?;

        assert!(!saved.stored && !saved.listed);
        assert!(store.is_empty());
        assert!(store.persistence().list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_without_backing_row_leaves_the_list() -> Result<()> {
        let store = sqlite_store().await?;
        let a = store.create(draft("A", 1)).await?;
        let id = a.id().get();
        store
            .persistence()
            .db()
            .await?
            .call(move |conn| {
                conn.execute("DELETE FROM notes WHERE id = ?", [id])?;
                Ok(())
            })
            .await
            .map_err(Error::write)?;
        let before = store.notes();

        let revised = a
            .revise(
                NoteEdit {
                    title: Some("A2".into()),
                    ..Default::default()
                },
                at(2),
            )
            .unwrap();
        let saved = store.save(revised).await?;

        assert!(!saved.stored);
        assert!(saved.listed);
        assert_eq!(store.notes(), before);
        assert_eq!(store.get(a.id()).unwrap().title(), "A");
        assert!(store.persistence().list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn remove_existing_and_missing() -> Result<()> {
        let store = sqlite_store().await?;
        let a = store.create(draft("A", 1)).await?;
        let b = store.create(draft("B", 2)).await?;

        let removed = store.remove(a.id()).await?;
        assert!(removed.stored && removed.listed);
        assert_eq!(store.notes().as_slice(), &[b]);

        let before = store.notes();
        let removed = store.remove(a.id()).await?;
        assert!(!removed.existed());
        assert_eq!(store.notes(), before);
        Ok(())
    }

    #[tokio::test]
    async fn failed_writes_leave_the_list_untouched() -> Result<()> {
        let store = flaky_store().await?;
        let a = store.create(draft("A", 1)).await?;
        let before = store.notes();

        store.persistence().fail_writes.store(true, Ordering::SeqCst);

        let create = store.create(draft("B", 2)).await;
        let save = store.save(a.revise(NoteEdit::default(), at(3)).unwrap()).await;
        let remove = store.remove(a.id()).await;

        assert!(matches!(create, Err(Error::PersistenceWriteFailed(_))));
        assert!(matches!(save, Err(Error::PersistenceWriteFailed(_))));
        assert!(matches!(remove, Err(Error::PersistenceWriteFailed(_))));
        assert_eq!(store.notes(), before);
        assert_eq!(store.persistence().list_all().await?, vec![a]);
        Ok(())
    }

    #[tokio::test]
    async fn changes_are_published() -> Result<()> {
        let store = sqlite_store().await?;
        let mut changes = store.subscribe();

        let a = store.create(draft("A", 1)).await?;
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().len(), 1);

        store.remove(NoteId::from(999)).await?;
        assert!(!changes.has_changed().unwrap());

        store.remove(a.id()).await?;
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_mutations_stay_sorted() -> Result<()> {
        let store = Arc::new(sqlite_store().await?);

        let tasks = (0..20).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.create(draft(&format!("n{i}"), (i * 7) % 5)).await })
        });
        for task in tasks.collect::<Vec<_>>() {
            task.await.unwrap()?;
        }

        let notes = store.notes();
        assert_eq!(notes.len(), 20);
        assert_sorted(&notes);

        for note in notes.iter().take(10) {
            store.remove(note.id()).await?;
        }
        assert_eq!(store.len(), 10);
        assert_sorted(&store.notes());
        Ok(())
    }

    #[tokio::test]
    async fn search_projects_current_list() -> Result<()> {
        let store = sqlite_store().await?;
        store
            .create(draft("Standup", 1).with_tags(vec!["work".to_string()]))
            .await?;
        store.create(draft("Poem", 2)).await?;

        let found = store.search(&Search::new("WOR"));
        assert_eq!(titles(&found), vec!["Standup"]);
        assert_eq!(store.search(&Search::default()), store.notes().to_vec());
        Ok(())
    }
}
