// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Packed resource filesystem

This crate defines a data format for storing a tree of files and directories
in a single binary blob, and a registry that serves those files from memory.
We call this data structure a *packed resources blob*.

The idea is that a producer walks a directory tree at build time, attaches
metadata to each file (size, modification time, whether to compress it) and
serializes everything to a blob. The blob is then embedded in a compiled
binary, typically via generated source that is `include!`d from `OUT_DIR`.

At run time the blob is parsed back into [PackedEntry] instances and merged
into a [Registry]. Consumers then look files up by path, or scan directories
with shell-style glob patterns, without touching the real filesystem.

A process-wide registry is available through [default_registry] and the
crate-level convenience functions [add], [load], [get], [contains], [scan]
and [dump].
*/

mod compression;
mod entry;
mod error;
mod filesystem;
mod global;
mod guard;
mod matcher;
mod parser;
pub mod path;
mod registry;
mod serialization;
mod source;
mod writer;

#[cfg(feature = "zstd")]
pub use crate::compression::ZstdCompression;
pub use crate::{
    compression::{Compression, NoCompression, ZlibCompression},
    entry::PackedEntry,
    error::{Error, Result},
    filesystem::{collect_entries, pack_paths, pack_to_file, pack_to_source_file, PackOptions},
    global::{
        add, add_static, contains, default_registry, dump, get, load, register_or_abort, scan,
    },
    guard::{Guard, Synchronized, Unsynchronized},
    matcher::{matches, matches_any},
    parser::{parse_entries, unpack, EntryParser},
    registry::{EntryIndex, EntryRef, LocalRegistry, Registry, ResourceRegistry},
    serialization::{HEADER_V1, MAX_PATH_LENGTH},
    source::{generate_registration_source, write_registration_source, SourceOptions},
    writer::{pack, write_packed_entries},
};
