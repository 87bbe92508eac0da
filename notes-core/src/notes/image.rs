use serde::{Deserialize, Serialize};

/// Which image representation the running platform can rely on.
///
/// Some environments cannot resolve a filesystem path in a later session and
/// have to carry the raw bytes instead.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageStorage {
    #[default]
    Path,
    Bytes,
}

/// Optional image attached to a note.
///
/// Maps onto two nullable columns; both may be populated at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Image {
    #[default]
    None,
    Path(String),
    Bytes(Vec<u8>),
    Both { path: String, bytes: Vec<u8> },
}

/// Borrowed view of the representation chosen by [`Image::preferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRef<'a> {
    Path(&'a str),
    Bytes(&'a [u8]),
}

impl Image {
    /// Empty paths and empty buffers count as absent.
    pub fn from_parts(path: Option<String>, bytes: Option<Vec<u8>>) -> Self {
        let path = path.filter(|p| !p.is_empty());
        let bytes = bytes.filter(|b| !b.is_empty());

        match (path, bytes) {
            (None, None) => Self::None,
            (Some(path), None) => Self::Path(path),
            (None, Some(bytes)) => Self::Bytes(bytes),
            (Some(path), Some(bytes)) => Self::Both { path, bytes },
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(path) | Self::Both { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) | Self::Both { bytes, .. } => Some(bytes.as_slice()),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn preferred(&self, storage: ImageStorage) -> Option<ImageRef<'_>> {
        match storage {
            ImageStorage::Path => self
                .path()
                .map(ImageRef::Path)
                .or_else(|| self.bytes().map(ImageRef::Bytes)),
            // paths from another session are dangling here
            ImageStorage::Bytes => self.bytes().map(ImageRef::Bytes),
        }
    }
}
