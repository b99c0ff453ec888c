// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Virtual path handling.

Every path stored in a blob or registry is *normalized*: `/`-separated,
rooted at `/`, with no empty, `.` or `..` segments and no trailing slash.
The root itself is `/`.
*/

/// The root directory path.
pub const ROOT: &str = "/";

/// Normalize a virtual path.
///
/// Both `/` and `\` are accepted as separators. `..` cannot escape the root.
/// Normalizing an already normalized path returns it unchanged.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(|c| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        ROOT.to_string()
    } else {
        let mut res = String::with_capacity(path.len() + 1);
        for segment in segments {
            res.push('/');
            res.push_str(segment);
        }
        res
    }
}

/// Rewrite a path so it lives under `prefix`.
///
/// An empty prefix leaves the path as is, apart from normalization.
pub fn rehome(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        normalize(path)
    } else {
        normalize(&format!("{}/{}", prefix, path))
    }
}

/// Obtain the parent directory of a normalized path.
///
/// Returns `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }

    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => Some(ROOT),
    }
}

/// Obtain the final component of a normalized path.
///
/// The root has an empty base name.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether normalized `path` is located under normalized directory `dir`.
///
/// A path is not located under itself.
pub fn is_descendant(path: &str, dir: &str) -> bool {
    if dir == ROOT {
        path != ROOT
    } else {
        path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
    }
}
