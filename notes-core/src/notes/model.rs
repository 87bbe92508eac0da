use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

use super::image::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Insertion-ordered tags without duplicates or blanks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the tag is blank or already present. Tags are
    /// kept exactly as given.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if tag.trim().is_empty() || self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let len = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != len
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

pub mod timestamp {
    use chrono::{DateTime, TimeZone, Utc};

    /// Current time at the precision the store keeps.
    pub fn now() -> DateTime<Utc> {
        truncate(Utc::now())
    }

    pub fn truncate(at: DateTime<Utc>) -> DateTime<Utc> {
        from_millis(to_millis(at)).unwrap_or(at)
    }

    pub fn to_millis(at: DateTime<Utc>) -> i64 {
        at.timestamp_millis()
    }

    pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis).single()
    }
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("title must not be empty"));
    }
    Ok(())
}

/// A note that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    title: String,
    body: String,
    tags: Tags,
    image: Image,
    updated_at: DateTime<Utc>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, updated_at: DateTime<Utc>) -> Result<Self> {
        let title = title.into();
        check_title(&title)?;

        Ok(Self {
            title,
            body: String::new(),
            tags: Tags::new(),
            image: Image::None,
            updated_at: timestamp::truncate(updated_at),
        })
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<Tags>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_image(mut self, image: Image) -> Self {
        self.image = image;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Attaches the identity the backing store assigned to this draft.
    pub(crate) fn into_note(self, id: NoteId) -> Note {
        Note {
            id,
            title: self.title,
            body: self.body,
            tags: self.tags,
            image: self.image,
            updated_at: self.updated_at,
        }
    }
}

/// A persisted note. Values are never changed in place; see [`Note::revise`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: NoteId,
    title: String,
    body: String,
    tags: Tags,
    image: Image,
    updated_at: DateTime<Utc>,
}

/// Replacement fields for [`Note::revise`]; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Tags>,
    pub image: Option<Image>,
}

impl Note {
    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn has_image(&self) -> bool {
        self.image.is_present()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Produces the next revision of this note with the same id.
    ///
    /// The caller supplies `updated_at`; it should not be earlier than the
    /// current one, but that is not checked here.
    pub fn revise(&self, edit: NoteEdit, updated_at: DateTime<Utc>) -> Result<Note> {
        if let Some(title) = &edit.title {
            check_title(title)?;
        }

        Ok(Note {
            id: self.id,
            title: edit.title.unwrap_or_else(|| self.title.clone()),
            body: edit.body.unwrap_or_else(|| self.body.clone()),
            tags: edit.tags.unwrap_or_else(|| self.tags.clone()),
            image: edit.image.unwrap_or_else(|| self.image.clone()),
            updated_at: timestamp::truncate(updated_at),
        })
    }

    /// Rebuilds a note from stored columns.
    pub(crate) fn from_stored(
        id: NoteId,
        title: String,
        body: String,
        tags: Tags,
        image: Image,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            body,
            tags,
            image,
            updated_at,
        }
    }
}
