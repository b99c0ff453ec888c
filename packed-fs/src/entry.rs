// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::path::{base_name, normalize, rehome},
    chrono::{DateTime, TimeZone, Utc},
    std::borrow::Cow,
};

/// Represents a file or directory stored in a packed resources blob.
///
/// The path is always normalized (see [crate::path::normalize]).
///
/// Content is a `Cow` so entries parsed from a blob with `'static` lifetime
/// can reference the blob's data directly instead of copying it. Content is
/// always held decompressed. `compressed` only controls how the content is
/// stored when the entry is packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedEntry<'a> {
    path: String,
    content: Cow<'a, [u8]>,
    size: u64,
    mod_time: i64,
    is_dir: bool,
    compressed: bool,
}

impl<'a> PackedEntry<'a> {
    /// Construct a file entry.
    pub fn file(path: impl AsRef<str>, content: impl Into<Cow<'a, [u8]>>) -> Self {
        let content = content.into();

        Self {
            path: normalize(path.as_ref()),
            size: content.len() as u64,
            content,
            mod_time: 0,
            is_dir: false,
            compressed: false,
        }
    }

    /// Construct a directory entry.
    pub fn directory(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize(path.as_ref()),
            content: Cow::Borrowed(&[]),
            size: 0,
            mod_time: 0,
            is_dir: true,
            compressed: false,
        }
    }

    /// Construct an entry from already validated fields.
    pub(crate) fn from_parts(
        path: String,
        content: Cow<'a, [u8]>,
        mod_time: i64,
        is_dir: bool,
        compressed: bool,
    ) -> Self {
        Self {
            path,
            size: content.len() as u64,
            content,
            mod_time,
            is_dir,
            compressed,
        }
    }

    /// Set the modification time, in seconds since the UNIX epoch.
    #[must_use]
    pub fn with_mod_time(mut self, mod_time: i64) -> Self {
        self.mod_time = mod_time;
        self
    }

    /// Set whether content should be compressed when packed.
    ///
    /// Has no effect on directories.
    #[must_use]
    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed && !self.is_dir;
        self
    }

    /// Move this entry under `prefix`.
    #[must_use]
    pub fn rehomed(mut self, prefix: &str) -> Self {
        self.path = rehome(prefix, &self.path);
        self
    }

    /// The normalized path of this entry.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The final component of the path.
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }

    /// The decompressed content. Empty for directories.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Uncompressed length of content.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time as seconds since UNIX epoch.
    pub fn mod_time(&self) -> i64 {
        self.mod_time
    }

    /// Modification time as a [DateTime].
    ///
    /// Out of range timestamps resolve to the epoch.
    pub fn modified_time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.mod_time, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Obtain an instance that owns all of its data.
    pub fn into_owned(self) -> PackedEntry<'static> {
        PackedEntry {
            path: self.path,
            content: Cow::Owned(self.content.into_owned()),
            size: self.size,
            mod_time: self.mod_time,
            is_dir: self.is_dir,
            compressed: self.compressed,
        }
    }
}
