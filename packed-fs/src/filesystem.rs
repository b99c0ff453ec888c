// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Packing of real filesystem trees. */

use {
    crate::{
        compression::{Compression, ZlibCompression},
        entry::PackedEntry,
        error::{Error, Result},
        source::{write_registration_source, SourceOptions},
        writer::{pack, write_packed_entries},
    },
    chrono::{DateTime, Utc},
    log::{debug, info},
    std::{
        fs::Metadata,
        io::{BufWriter, Write},
        path::{Component, Path},
        sync::Arc,
    },
};

/// Settings for packing filesystem paths into a blob.
#[derive(Clone, Debug)]
pub struct PackOptions {
    /// Directory all packed paths are placed under.
    pub prefix: Option<String>,
    /// Whether file content is stored compressed.
    pub compress: bool,
    /// Codec used for compressed content.
    pub compression: Arc<dyn Compression>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            compress: false,
            compression: Arc::new(ZlibCompression::default()),
        }
    }
}

impl PackOptions {
    #[must_use]
    pub fn prefix(mut self, prefix: impl ToString) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: Arc<dyn Compression>) -> Self {
        self.compression = compression;
        self
    }
}

fn mod_time(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .map(|t| DateTime::<Utc>::from(t).timestamp())
        .unwrap_or(0)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a path relative to a packed root to a virtual path.
fn virtual_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect entries for a filesystem path.
///
/// A file yields a single entry named after it, located at the root. A
/// directory yields entries for everything below it, keyed relative to the
/// directory and sorted by name within each directory. The directory itself
/// is not included.
pub fn collect_entries(source: &Path, compress: bool) -> Result<Vec<PackedEntry<'static>>> {
    let metadata = std::fs::metadata(source).map_err(|e| Error::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    if !metadata.is_dir() {
        let name = source
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        return Ok(vec![PackedEntry::file(name, read_file(source)?)
            .with_mod_time(mod_time(&metadata))
            .with_compression(compress)]);
    }

    let mut entries = Vec::new();

    for entry in walkdir::WalkDir::new(source)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        let metadata = entry.metadata()?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .unwrap_or_else(|_| entry.path());
        let path = virtual_path(relative);

        if metadata.is_dir() {
            entries.push(PackedEntry::directory(path).with_mod_time(mod_time(&metadata)));
        } else {
            entries.push(
                PackedEntry::file(path, read_file(entry.path())?)
                    .with_mod_time(mod_time(&metadata))
                    .with_compression(compress),
            );
        }
    }

    debug!("collected {} entries from {}", entries.len(), source.display());

    Ok(entries)
}

fn collect_all<P: AsRef<Path>>(sources: &[P], compress: bool) -> Result<Vec<PackedEntry<'static>>> {
    let mut entries = Vec::new();

    for source in sources {
        entries.extend(collect_entries(source.as_ref(), compress)?);
    }

    Ok(entries)
}

/// Pack filesystem paths into a new blob.
///
/// Entries from all sources share one namespace. Should two sources produce
/// the same path, both entries are written and the later one wins when the
/// blob is merged into a registry.
pub fn pack_paths<P: AsRef<Path>>(sources: &[P], options: &PackOptions) -> Result<Vec<u8>> {
    let entries = collect_all(sources, options.compress)?;

    pack(
        &entries,
        options.prefix.as_deref(),
        options.compression.as_ref(),
    )
}

/// Pack filesystem paths into a blob file at `dest`.
pub fn pack_to_file<P: AsRef<Path>>(
    sources: &[P],
    dest: impl AsRef<Path>,
    options: &PackOptions,
) -> Result<()> {
    let dest = dest.as_ref();
    let entries = collect_all(sources, options.compress)?;

    let mut writer = BufWriter::new(std::fs::File::create(dest)?);
    write_packed_entries(
        &entries,
        &mut writer,
        options.prefix.as_deref(),
        options.compression.as_ref(),
    )?;
    writer.flush()?;

    info!("wrote {} entries to {}", entries.len(), dest.display());

    Ok(())
}

/// Pack filesystem paths and write Rust source embedding the blob to `dest`.
pub fn pack_to_source_file<P: AsRef<Path>>(
    sources: &[P],
    dest: impl AsRef<Path>,
    options: &PackOptions,
    source_options: &SourceOptions,
) -> Result<()> {
    let dest = dest.as_ref();
    let blob = pack_paths(sources, options)?;

    write_registration_source(dest, &blob, source_options)?;

    info!("wrote {} byte blob as source to {}", blob.len(), dest.display());

    Ok(())
}
