// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Shell-style glob matching of entry names. */

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Whether `name` matches a single glob `pattern`.
///
/// `*` matches any run of characters except `/`, `?` matches exactly one
/// character and everything else matches literally. A malformed pattern
/// matches nothing. Commas have no special meaning here; use [matches_any]
/// for comma-separated pattern lists.
pub fn matches(name: &str, pattern: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(pattern) => pattern.matches_with(name, MATCH_OPTIONS),
        Err(_) => false,
    }
}

/// Whether `name` matches any pattern in a comma-separated list.
///
/// Each pattern is trimmed of whitespace. Empty patterns are ignored and a
/// list without any pattern matches everything.
pub fn matches_any(name: &str, patterns: &str) -> bool {
    let mut candidates = patterns
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .peekable();

    if candidates.peek().is_none() {
        return true;
    }

    candidates.any(|pattern| matches(name, pattern))
}
