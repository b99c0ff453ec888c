// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! In-memory registry of packed entries. */

use {
    crate::{
        compression::{Compression, ZlibCompression},
        entry::PackedEntry,
        error::{Error, Result},
        guard::{Guard, Synchronized, Unsynchronized},
        matcher::matches_any,
        parser::parse_entries,
        path::{self, normalize},
    },
    log::{debug, info, warn},
    std::{collections::HashMap, io::Write, path::Path, sync::Arc},
};

/// A shared handle to an entry held by a registry.
///
/// Replacing an entry swaps the whole handle, so holders never observe a mix
/// of old and new content.
pub type EntryRef = Arc<PackedEntry<'static>>;

/// Mapping of normalized path to entry, remembering insertion order.
///
/// Every entry's ancestor directories are present, synthesized on insert if
/// the source never provided them. The root `/` is always present once
/// anything has been inserted.
#[derive(Debug, Default)]
pub struct EntryIndex {
    entries: HashMap<String, EntryRef>,
    order: Vec<String>,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert an entry, replacing any entry with the same path.
    ///
    /// A replaced path keeps its original position in the iteration order.
    /// Missing ancestor directories are inserted ahead of the entry, carrying
    /// its modification time. An ancestor that exists as a file is replaced
    /// by a directory. A file replacing a directory removes everything that
    /// was below the directory.
    pub fn insert(&mut self, entry: PackedEntry<'static>) {
        let mut missing = Vec::new();
        let mut current = path::parent(entry.path());

        while let Some(dir) = current {
            match self.entries.get(dir) {
                Some(existing) if existing.is_dir() => break,
                _ => missing.push(dir.to_string()),
            }
            current = path::parent(dir);
        }

        for dir in missing.into_iter().rev() {
            self.insert_one(PackedEntry::directory(dir).with_mod_time(entry.mod_time()));
        }

        let replaces_dir = self
            .entries
            .get(entry.path())
            .map_or(false, |existing| existing.is_dir());
        if replaces_dir && !entry.is_dir() {
            self.remove_descendants(entry.path());
        }

        self.insert_one(entry);
    }

    fn remove_descendants(&mut self, dir: &str) {
        self.order.retain(|key| !path::is_descendant(key, dir));
        self.entries.retain(|key, _| !path::is_descendant(key, dir));
    }

    fn insert_one(&mut self, entry: PackedEntry<'static>) {
        let key = entry.path().to_string();

        if self.entries.insert(key.clone(), Arc::new(entry)).is_none() {
            self.order.push(key);
        }
    }

    /// Look up a normalized path.
    pub fn get(&self, path: &str) -> Option<&EntryRef> {
        self.entries.get(path)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryRef> + '_ {
        self.order.iter().filter_map(move |key| self.entries.get(key))
    }

    /// Find entries under the normalized directory `dir` whose name matches
    /// the comma-separated `patterns`.
    pub fn scan(&self, dir: &str, patterns: &str, recursive: bool) -> Result<Vec<EntryRef>> {
        match self.entries.get(dir) {
            Some(entry) if entry.is_dir() => {}
            _ => return Err(Error::NotDirectory(dir.to_string())),
        }

        Ok(self
            .iter()
            .filter(|entry| {
                if recursive {
                    path::is_descendant(entry.path(), dir)
                } else {
                    path::parent(entry.path()) == Some(dir)
                }
            })
            .filter(|entry| matches_any(entry.name(), patterns))
            .cloned()
            .collect())
    }
}

/// A path-addressable collection of entries unpacked from packed resources
/// blobs.
///
/// The guard strategy `G` decides whether access is synchronized. Use the
/// [Registry] alias for a registry shared between threads and [LocalRegistry]
/// for one confined to a single thread.
///
/// Blobs are merged one entry at a time. Each entry is replaced atomically,
/// but a reader running concurrently with [Self::add] may observe some of the
/// blob's entries and not others.
#[derive(Debug)]
pub struct ResourceRegistry<G: Guard<EntryIndex>> {
    index: G,
    compression: Arc<dyn Compression>,
}

/// A registry safe to share across threads.
pub type Registry = ResourceRegistry<Synchronized<EntryIndex>>;

/// A registry without locking, confined to one thread.
pub type LocalRegistry = ResourceRegistry<Unsynchronized<EntryIndex>>;

impl<G: Guard<EntryIndex>> Default for ResourceRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard<EntryIndex>> ResourceRegistry<G> {
    /// Construct an empty registry decompressing with zlib.
    pub fn new() -> Self {
        Self::with_compression(Arc::new(ZlibCompression::default()))
    }

    /// Construct an empty registry using a specific decompression codec.
    pub fn with_compression(compression: Arc<dyn Compression>) -> Self {
        Self {
            index: G::new(EntryIndex::new()),
            compression,
        }
    }

    fn merge<'a>(
        &self,
        entries: impl Iterator<Item = Result<PackedEntry<'a>>>,
        prefix: Option<&str>,
        owned: impl Fn(PackedEntry<'a>) -> PackedEntry<'static>,
    ) -> Result<usize> {
        let mut count = 0;

        for entry in entries {
            let mut entry = owned(entry?);
            if let Some(prefix) = prefix {
                entry = entry.rehomed(prefix);
            }

            self.index.write(|index| index.insert(entry));
            count += 1;
        }

        Ok(count)
    }

    /// Unpack a blob and merge its entries into this registry.
    ///
    /// If `prefix` is given, every entry is stored under it. Entries replace
    /// existing entries having the same path.
    ///
    /// On error, entries preceding the failing one remain merged.
    pub fn add(&self, blob: &[u8], prefix: Option<&str>) -> Result<()> {
        let parser = parse_entries(blob, self.compression.as_ref())?;
        let count = self.merge(parser, prefix, PackedEntry::into_owned)?;

        debug!("merged {} entries from {} byte blob", count, blob.len());

        Ok(())
    }

    /// Like [Self::add] but for blobs living for the whole process.
    ///
    /// Uncompressed content references the blob instead of being copied.
    pub fn add_static(&self, blob: &'static [u8], prefix: Option<&str>) -> Result<()> {
        let parser = parse_entries(blob, self.compression.as_ref())?;
        let count = self.merge(parser, prefix, |entry| entry)?;

        debug!("merged {} entries from static {} byte blob", count, blob.len());

        Ok(())
    }

    /// Read a blob from a filesystem path and merge it.
    pub fn load(&self, path: impl AsRef<Path>, prefix: Option<&str>) -> Result<()> {
        let path = path.as_ref();

        let data = std::fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        info!("loading resources from {}", path.display());
        self.add(&data, prefix)
    }

    /// Obtain the entry at `path`, if present.
    pub fn get(&self, path: &str) -> Option<EntryRef> {
        let path = normalize(path);
        self.index.read(|index| index.get(&path).cloned())
    }

    /// Obtain a copy of the content of the entry at `path`.
    pub fn get_content(&self, path: &str) -> Option<Vec<u8>> {
        self.get(path).map(|entry| entry.content().to_vec())
    }

    /// Obtain the entry at `path`, resolving directories to an index file.
    ///
    /// If `path` is a directory, the first of `index_files` existing inside
    /// it is returned, or the directory itself if none exists.
    pub fn get_with_index(&self, path: &str, index_files: &[&str]) -> Option<EntryRef> {
        let entry = self.get(path)?;

        if !entry.is_dir() {
            return Some(entry);
        }

        index_files
            .iter()
            .find_map(|name| self.get(&format!("{}/{}", entry.path(), name)))
            .or(Some(entry))
    }

    /// Whether an entry exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        let path = normalize(path);
        self.index.read(|index| index.get(&path).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.index.read(|index| index.is_empty())
    }

    pub fn len(&self) -> usize {
        self.index.read(|index| index.len())
    }

    /// Paths of all entries in insertion order.
    pub fn paths(&self) -> Vec<String> {
        self.index
            .read(|index| index.iter().map(|e| e.path().to_string()).collect())
    }

    /// Find entries located in the directory at `path`.
    ///
    /// `patterns` is a comma-separated list of glob patterns matched against
    /// entry names; an empty list matches everything. With `recursive`, the
    /// whole subtree is searched instead of only direct children.
    ///
    /// Results are in insertion order and include directories.
    pub fn scan(&self, path: &str, patterns: &str, recursive: bool) -> Result<Vec<EntryRef>> {
        let dir = normalize(path);
        self.index.read(|index| index.scan(&dir, patterns, recursive))
    }

    /// Like [Self::scan] but only returns files.
    pub fn scan_files(
        &self,
        path: &str,
        patterns: &str,
        recursive: bool,
    ) -> Result<Vec<EntryRef>> {
        let mut entries = self.scan(path, patterns, recursive)?;
        entries.retain(|entry| !entry.is_dir());

        Ok(entries)
    }

    /// Write a listing of all entries in insertion order.
    pub fn write_listing<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.index.read(|index| {
            for (i, entry) in index.iter().enumerate() {
                writeln!(
                    dest,
                    "{:>5}. {}  {:>10}  {}{}",
                    i + 1,
                    entry.modified_time().format("%Y-%m-%d %H:%M:%S"),
                    entry.size(),
                    entry.path(),
                    if entry.is_dir() && entry.path() != path::ROOT {
                        "/"
                    } else {
                        ""
                    }
                )?;
            }

            writeln!(dest, "TOTAL ENTRIES: {}", index.len())
        })
    }

    /// Print a listing of all entries to stdout.
    pub fn dump(&self) {
        let stdout = std::io::stdout();
        if let Err(e) = self.write_listing(&mut stdout.lock()) {
            warn!("unable to write resources listing: {}", e);
        }
    }

    /// Write the entry at `src` and everything below it to the filesystem.
    ///
    /// Entry paths are resolved relative to `src`, so exporting `/static`
    /// to `out` writes `/static/css/site.css` to `out/css/site.css`. Returns
    /// the number of files written, or [Error::NotFound] if `src` does not
    /// exist.
    pub fn export(&self, src: &str, dest_dir: impl AsRef<Path>) -> Result<usize> {
        let src = normalize(src);
        let dest_dir = dest_dir.as_ref();

        let root = self.get(&src).ok_or_else(|| Error::NotFound(src.clone()))?;

        let entries = if root.is_dir() {
            let mut entries = vec![root];
            entries.extend(self.scan(&src, "", true)?);
            entries
        } else {
            vec![root]
        };

        let mut count = 0;
        for entry in entries {
            let relative = if entry.path() == src {
                if entry.is_dir() {
                    ""
                } else {
                    entry.name()
                }
            } else if src == path::ROOT {
                &entry.path()[1..]
            } else {
                &entry.path()[src.len() + 1..]
            };
            let dest = dest_dir.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&dest, entry.content())?;
                count += 1;
            }
        }

        info!("exported {} files from {} to {}", count, src, dest_dir.display());

        Ok(count)
    }
}
