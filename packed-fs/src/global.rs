// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Process-wide default registry.

Generated registration code merges its blob into this registry at start-up
and application code reads from it without threading a registry handle
around.
*/

use {
    crate::{
        error::Result,
        registry::{EntryRef, Registry},
    },
    log::error,
    once_cell::sync::Lazy,
    std::path::Path,
};

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Obtain the process-wide default registry.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// Merge a blob into the default registry. See [Registry::add].
pub fn add(blob: &[u8], prefix: Option<&str>) -> Result<()> {
    DEFAULT_REGISTRY.add(blob, prefix)
}

/// Merge a `'static` blob into the default registry without copying
/// uncompressed content.
pub fn add_static(blob: &'static [u8], prefix: Option<&str>) -> Result<()> {
    DEFAULT_REGISTRY.add_static(blob, prefix)
}

/// Read a blob from the filesystem and merge it into the default registry.
pub fn load(path: impl AsRef<Path>, prefix: Option<&str>) -> Result<()> {
    DEFAULT_REGISTRY.load(path, prefix)
}

pub fn get(path: &str) -> Option<EntryRef> {
    DEFAULT_REGISTRY.get(path)
}

pub fn contains(path: &str) -> bool {
    DEFAULT_REGISTRY.contains(path)
}

pub fn scan(path: &str, patterns: &str, recursive: bool) -> Result<Vec<EntryRef>> {
    DEFAULT_REGISTRY.scan(path, patterns, recursive)
}

pub fn dump() {
    DEFAULT_REGISTRY.dump()
}

/// Merge an embedded blob into the default registry or abort the process.
///
/// Called by generated registration code. A blob failing to decode there
/// means the binary itself is broken, so there is nothing to recover.
pub fn register_or_abort(blob: &'static [u8], prefix: Option<&str>) {
    if let Err(e) = add_static(blob, prefix) {
        error!("failed to register embedded resources: {}", e);
        eprintln!("fatal: embedded resources are corrupt: {}", e);
        std::process::abort();
    }
}
