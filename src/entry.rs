//! One archived file: identity, sizes, offset, checksum, and lazy content.
//!
//! `EntryPayload` is an explicit sum type rather than a `modified: bool`
//! plus an optional content buffer, so an entry can't be "modified" with
//! stale size/offset/checksum fields left dangling.

#[derive(Debug, Clone)]
pub enum EntryPayload {
    /// Backed by a byte range in the archive's source, as read from an
    /// existing file table.
    Stored {
        offset: u32,
        size_compressed: u32,
        size_uncompressed: u32,
        checksum: u32,
    },
    /// Newly added or replaced content awaiting the next save.
    Pending { bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub pack_name: String,
    pub path: String,
    pub payload: EntryPayload,
}

impl Entry {
    pub fn new_stored(
        pack_name: impl Into<String>,
        path: impl Into<String>,
        offset: u32,
        size_compressed: u32,
        size_uncompressed: u32,
        checksum: u32,
    ) -> Self {
        Entry {
            pack_name: pack_name.into(),
            path: path.into(),
            payload: EntryPayload::Stored {
                offset,
                size_compressed,
                size_uncompressed,
                checksum,
            },
        }
    }

    pub fn new_pending(
        pack_name: impl Into<String>,
        path: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Entry {
            pack_name: pack_name.into(),
            path: path.into(),
            payload: EntryPayload::Pending { bytes },
        }
    }

    pub fn full_path(&self) -> String {
        format!("{}/{}", self.pack_name, self.path)
    }

    pub fn modified(&self) -> bool {
        matches!(self.payload, EntryPayload::Pending { .. })
    }

    pub fn set_content(&mut self, bytes: Vec<u8>) {
        self.payload = EntryPayload::Pending { bytes };
    }

    pub fn size_compressed(&self) -> Option<u32> {
        match &self.payload {
            EntryPayload::Stored {
                size_compressed, ..
            } => Some(*size_compressed),
            EntryPayload::Pending { .. } => None,
        }
    }

    pub fn size_uncompressed(&self) -> Option<u32> {
        match &self.payload {
            EntryPayload::Stored {
                size_uncompressed, ..
            } => Some(*size_uncompressed),
            EntryPayload::Pending { bytes } => Some(bytes.len() as u32),
        }
    }

    pub fn checksum(&self) -> Option<u32> {
        match &self.payload {
            EntryPayload::Stored { checksum, .. } => Some(*checksum),
            EntryPayload::Pending { .. } => None,
        }
    }
}
