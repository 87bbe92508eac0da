use async_trait::async_trait;
use rusqlite::{params, types::Type, Row};
use sea_query::{Iden, Order, Query, SqliteQueryBuilder};
use sea_query_rusqlite::RusqliteBinder;

use crate::{
    db::{self, LazyDb},
    Error, Result,
};

use super::{
    image::Image,
    model::{timestamp, Note, NoteDraft, NoteId, Tags},
};

/// Durable backing store for notes.
///
/// `update` and `delete` report `false` for an unknown id instead of failing.
#[async_trait]
pub trait NotePersistence: Send + Sync {
    /// All notes, most recently updated first, ties in insertion order.
    async fn list_all(&self) -> Result<Vec<Note>>;

    async fn insert(&self, draft: &NoteDraft) -> Result<NoteId>;

    async fn update(&self, note: &Note) -> Result<bool>;

    async fn delete(&self, id: NoteId) -> Result<bool>;
}

#[derive(Iden)]
pub enum Notes {
    Table,
    Id,
    Title,
    Body,
    Tags,
    UpdatedAt,
    ImagePath,
    ImageBytes,
}

impl<'a> TryFrom<&Row<'a>> for Note {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        let tags: String = row.get(3)?;
        let tags = serde_json::from_str::<Tags>(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        let updated_at: i64 = row.get(4)?;
        let updated_at =
            timestamp::from_millis(updated_at).ok_or(rusqlite::Error::IntegralValueOutOfRange(4, updated_at))?;

        Ok(Note::from_stored(
            NoteId::from(row.get::<_, i64>(0)?),
            row.get(1)?,
            row.get(2)?,
            tags,
            Image::from_parts(row.get(5)?, row.get(6)?),
            updated_at,
        ))
    }
}

fn encode_tags(tags: &Tags) -> rusqlite::Result<String> {
    serde_json::to_string(tags).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// SQLite-backed [`NotePersistence`].
#[derive(Debug)]
pub struct SqliteNotes {
    db: LazyDb,
}

impl SqliteNotes {
    pub fn new(db: LazyDb) -> Self {
        Self { db }
    }

    pub async fn db(&self) -> Result<&db::DB> {
        self.db.get().await.map_err(Error::unavailable)
    }
}

#[async_trait]
impl NotePersistence for SqliteNotes {
    async fn list_all(&self) -> Result<Vec<Note>> {
        self.db()
            .await?
            .call(|conn| {
                let (sql, values) = Query::select()
                    .columns([
                        Notes::Id,
                        Notes::Title,
                        Notes::Body,
                        Notes::Tags,
                        Notes::UpdatedAt,
                        Notes::ImagePath,
                        Notes::ImageBytes,
                    ])
                    .from(Notes::Table)
                    .order_by(Notes::UpdatedAt, Order::Desc)
                    .order_by(Notes::Id, Order::Asc)
                    .build_rusqlite(SqliteQueryBuilder);

                let notes = conn
                    .prepare(&sql)?
                    .query_map(&*values.as_params(), |row| Note::try_from(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(notes)
            })
            .await
            .map_err(Error::read)
    }

    async fn insert(&self, draft: &NoteDraft) -> Result<NoteId> {
        let draft = draft.clone();

        self.db()
            .await?
            .call(move |conn| {
                let id = conn.query_row(
                    r#"INSERT INTO notes (title, body, tags, updated_at, image_path, image_bytes)
                    VALUES (?, ?, ?, ?, ?, ?)
                    RETURNING id"#,
                    params![
                        draft.title(),
                        draft.body(),
                        encode_tags(draft.tags())?,
                        timestamp::to_millis(draft.updated_at()),
                        draft.image().path(),
                        draft.image().bytes(),
                    ],
                    |row| row.get::<_, i64>(0),
                )?;
                Ok(NoteId::from(id))
            })
            .await
            .map_err(Error::write)
            .inspect(|id| tracing::debug!(%id, "inserted note"))
    }

    async fn update(&self, note: &Note) -> Result<bool> {
        let note = note.clone();

        self.db()
            .await?
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE notes SET title = ?, body = ?, tags = ?, updated_at = ?, image_path = ?, image_bytes = ?
                    WHERE id = ?"#,
                    params![
                        note.title(),
                        note.body(),
                        encode_tags(note.tags())?,
                        timestamp::to_millis(note.updated_at()),
                        note.image().path(),
                        note.image().bytes(),
                        note.id().get(),
                    ],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::write)
    }

    async fn delete(&self, id: NoteId) -> Result<bool> {
        self.db()
            .await?
            .call(move |conn| {
                let changed = conn.execute("DELETE FROM notes WHERE id = ?", params![id.get()])?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::write)
    }
}
