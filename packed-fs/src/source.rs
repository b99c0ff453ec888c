// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Generation of Rust source embedding a packed resources blob.

A build script packs resources, writes the generated source to `OUT_DIR` and
the crate pulls it in:

```ignore
include!(concat!(env!("OUT_DIR"), "/resources.rs"));

fn main() {
    register_resources();
}
```
*/

use {
    crate::error::{Error, Result},
    handlebars::Handlebars,
    once_cell::sync::Lazy,
    std::{collections::BTreeMap, fmt::Write as _, path::Path},
};

static HANDLEBARS: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();

    handlebars
        .register_template_string(
            "registration.rs",
            include_str!("templates/registration.rs.hbs"),
        )
        .expect("unable to register registration.rs template");

    handlebars
});

/// Number of blob bytes rendered per line of the byte string literal.
const BYTES_PER_LINE: usize = 32;

/// Controls the names used in generated registration source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceOptions {
    /// Name of the generated registration function.
    pub function_name: String,
    /// Name of the generated `static` holding the blob.
    pub static_name: String,
    /// Path through which the generated code reaches this crate.
    pub crate_path: String,
    /// Prefix passed when registering the blob.
    pub prefix: Option<String>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            function_name: "register_resources".to_string(),
            static_name: "PACKED_RESOURCES".to_string(),
            crate_path: "packed_fs".to_string(),
            prefix: None,
        }
    }
}

impl SourceOptions {
    #[must_use]
    pub fn function_name(mut self, name: impl ToString) -> Self {
        self.function_name = name.to_string();
        self
    }

    #[must_use]
    pub fn static_name(mut self, name: impl ToString) -> Self {
        self.static_name = name.to_string();
        self
    }

    #[must_use]
    pub fn crate_path(mut self, path: impl ToString) -> Self {
        self.crate_path = path.to_string();
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: Option<impl ToString>) -> Self {
        self.prefix = prefix.map(|p| p.to_string());
        self
    }

    fn validate(&self) -> Result<()> {
        for name in [&self.function_name, &self.static_name] {
            if !is_identifier(name) {
                return Err(Error::InvalidIdentifier(name.clone()));
            }
        }

        let segments = self
            .crate_path
            .strip_prefix("::")
            .unwrap_or(&self.crate_path);
        if !segments.split("::").all(is_identifier) {
            return Err(Error::InvalidIdentifier(self.crate_path.clone()));
        }

        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        Some('_') if s.len() > 1 => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render `data` as the body of a Rust byte string literal.
///
/// Output is split across lines with string continuation escapes, so
/// characters that a continuation would swallow are always escaped.
fn byte_string_literal(data: &[u8]) -> String {
    let mut res = String::with_capacity(data.len() * 4 + data.len() / BYTES_PER_LINE * 3);

    for chunk in data.chunks(BYTES_PER_LINE) {
        res.push_str("\\\n");
        for &b in chunk {
            match b {
                b'"' | b'\\' => {
                    res.push('\\');
                    res.push(b as char);
                }
                0x21..=0x7e => res.push(b as char),
                _ => {
                    // Writing to a String cannot fail.
                    let _ = write!(res, "\\x{:02x}", b);
                }
            }
        }
    }

    res
}

/// Generate Rust source code embedding a packed resources blob.
///
/// The source defines a `static` holding the blob and a function merging it
/// into the default registry via `register_or_abort`.
pub fn generate_registration_source(blob: &[u8], options: &SourceOptions) -> Result<String> {
    options.validate()?;

    let mut data = BTreeMap::new();
    data.insert("function_name", options.function_name.clone());
    data.insert("static_name", options.static_name.clone());
    data.insert("crate_path", options.crate_path.clone());
    data.insert(
        "prefix",
        match &options.prefix {
            Some(prefix) => format!("Some({:?})", prefix),
            None => "None".to_string(),
        },
    );
    data.insert("blob_literal", byte_string_literal(blob));

    Ok(HANDLEBARS.render("registration.rs", &data)?)
}

/// Generate registration source and write it to `path`.
pub fn write_registration_source(
    path: impl AsRef<Path>,
    blob: &[u8],
    options: &SourceOptions,
) -> Result<()> {
    let source = generate_registration_source(blob, options)?;
    std::fs::write(path.as_ref(), source)?;

    Ok(())
}
