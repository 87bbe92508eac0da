use super::model::Note;

/// Search query over the canonical list.
///
/// Holds nothing but the normalized query; every projection is computed
/// fresh from the notes it is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Search {
    query: String,
    needle: String,
}

impl Search {
    pub fn new(raw: &str) -> Self {
        let mut search = Self::default();
        search.set_query(raw);
        search
    }

    /// Returns `false` when the trimmed query did not change.
    pub fn set_query(&mut self, raw: &str) -> bool {
        let query = raw.trim();
        if query == self.query {
            return false;
        }
        self.query = query.to_string();
        self.needle = query.to_lowercase();
        true
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Case-insensitive substring match on title, body or any tag.
    pub fn matches(&self, note: &Note) -> bool {
        if self.is_empty() {
            return true;
        }
        let needle = self.needle.as_str();

        note.title().to_lowercase().contains(needle)
            || note.body().to_lowercase().contains(needle)
            || note.tags().iter().any(|tag| tag.to_lowercase().contains(needle))
    }

    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        notes.iter().filter(|note| self.matches(note)).collect()
    }
}
