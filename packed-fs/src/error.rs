// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot encode path {path:?}: {reason}")]
    Encoding { path: String, reason: &'static str },

    #[error("corrupt resources blob: {0}")]
    CorruptBlob(&'static str),

    #[error("failed to decompress {path}: {source}")]
    Decompression {
        path: String,
        source: std::io::Error,
    },

    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not a directory")]
    NotDirectory(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("not a valid Rust identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
