// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Serialization of packed resources blobs. */

use {
    crate::{
        compression::Compression,
        entry::PackedEntry,
        error::{Error, Result},
        path::{normalize, rehome, ROOT},
        serialization::{flag_to_u8, HEADER_V1, MAX_PATH_LENGTH},
    },
    byteorder::{LittleEndian, WriteBytesExt},
    log::debug,
    rayon::prelude::*,
    std::{borrow::Cow, convert::TryFrom, io::Write},
};

/// An entry ready to be written: final path and stored content resolved.
struct PreparedEntry<'e> {
    path: String,
    stored: Cow<'e, [u8]>,
    entry: &'e PackedEntry<'e>,
}

fn resolve_path(entry: &PackedEntry, prefix: Option<&str>) -> Result<String> {
    if entry.path().is_empty() {
        return Err(Error::Encoding {
            path: String::new(),
            reason: "path is empty",
        });
    }

    let path = match prefix {
        Some(prefix) => rehome(prefix, entry.path()),
        None => normalize(entry.path()),
    };

    if path.len() > MAX_PATH_LENGTH {
        return Err(Error::Encoding {
            path,
            reason: "path exceeds maximum length",
        });
    }

    if path == ROOT && !entry.is_dir() {
        return Err(Error::Encoding {
            path,
            reason: "file path resolves to the root directory",
        });
    }

    Ok(path)
}

fn prepare_entry<'e>(
    entry: &'e PackedEntry<'e>,
    prefix: Option<&str>,
    compression: &dyn Compression,
) -> Result<PreparedEntry<'e>> {
    let path = resolve_path(entry, prefix)?;

    let stored = if entry.is_compressed() {
        Cow::Owned(compression.compress(entry.content())?)
    } else {
        Cow::Borrowed(entry.content())
    };

    Ok(PreparedEntry {
        path,
        stored,
        entry,
    })
}

fn write_entry<W: Write>(prepared: &PreparedEntry, dest: &mut W) -> Result<()> {
    let path_len = u16::try_from(prepared.path.len()).map_err(|_| Error::Encoding {
        path: prepared.path.clone(),
        reason: "path length does not fit in 16 bits",
    })?;

    dest.write_u16::<LittleEndian>(path_len)?;
    dest.write_all(prepared.path.as_bytes())?;
    dest.write_u8(flag_to_u8(prepared.entry.is_dir()))?;
    dest.write_u64::<LittleEndian>(prepared.entry.size())?;
    dest.write_i64::<LittleEndian>(prepared.entry.mod_time())?;
    dest.write_u8(flag_to_u8(prepared.entry.is_compressed()))?;
    dest.write_u64::<LittleEndian>(prepared.stored.len() as u64)?;
    dest.write_all(&prepared.stored)?;

    Ok(())
}

/// Write a packed resources blob, version 1.
///
/// Every path is normalized. If `prefix` is given, every path is rewritten to
/// live under it. Entries flagged as compressed have their content compressed
/// with `compression`, in parallel.
///
/// Entries are written in the order given.
pub fn write_packed_entries<W: Write>(
    entries: &[PackedEntry],
    dest: &mut W,
    prefix: Option<&str>,
    compression: &dyn Compression,
) -> Result<()> {
    let count = u32::try_from(entries.len()).map_err(|_| Error::Encoding {
        path: String::new(),
        reason: "too many entries",
    })?;

    let prepared = entries
        .par_iter()
        .map(|entry| prepare_entry(entry, prefix, compression))
        .collect::<Result<Vec<_>>>()?;

    dest.write_all(HEADER_V1)?;
    dest.write_u32::<LittleEndian>(count)?;

    for entry in &prepared {
        write_entry(entry, dest)?;
    }

    debug!(
        "packed {} entries ({} compressed)",
        count,
        prepared.iter().filter(|e| e.entry.is_compressed()).count()
    );

    Ok(())
}

/// Serialize entries to a new packed resources blob.
pub fn pack(
    entries: &[PackedEntry],
    prefix: Option<&str>,
    compression: &dyn Compression,
) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    write_packed_entries(entries, &mut data, prefix, compression)?;

    Ok(data)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::compression::{NoCompression, ZlibCompression},
    };

    #[test]
    fn test_write_empty() -> Result<()> {
        let data = pack(&[], None, &NoCompression)?;

        let mut expected: Vec<u8> = b"packdfs\x01".to_vec();
        // Number of entries.
        expected.write_u32::<LittleEndian>(0)?;

        assert_eq!(data, expected);

        Ok(())
    }

    #[test]
    fn test_write_single_file() -> Result<()> {
        let entry = PackedEntry::file("foo", b"bar".as_ref()).with_mod_time(42);
        let data = pack(&[entry], None, &NoCompression)?;

        let mut expected: Vec<u8> = b"packdfs\x01".to_vec();
        expected.write_u32::<LittleEndian>(1)?;
        expected.write_u16::<LittleEndian>(4)?;
        expected.write_all(b"/foo")?;
        // Not a directory.
        expected.write_u8(0)?;
        // Size.
        expected.write_u64::<LittleEndian>(3)?;
        // Modification time.
        expected.write_i64::<LittleEndian>(42)?;
        // Not compressed.
        expected.write_u8(0)?;
        expected.write_u64::<LittleEndian>(3)?;
        expected.write_all(b"bar")?;

        assert_eq!(data, expected);

        Ok(())
    }

    #[test]
    fn test_write_prefix() -> Result<()> {
        let entries = vec![PackedEntry::directory("a"), PackedEntry::file("a/b", vec![1u8])];
        let data = pack(&entries, Some("static"), &NoCompression)?;

        let path_len = u16::from_le_bytes([data[12], data[13]]) as usize;
        assert_eq!(&data[14..14 + path_len], b"/static/a");

        Ok(())
    }

    #[test]
    fn test_write_compressed() -> Result<()> {
        let content = b"abcabcabc".repeat(100);
        let entry = PackedEntry::file("x", content.as_slice()).with_compression(true);

        let compressed = pack(&[entry.clone()], None, &ZlibCompression::default())?;
        let raw = pack(&[entry.with_compression(false)], None, &ZlibCompression::default())?;

        assert!(compressed.len() < raw.len());

        Ok(())
    }

    #[test]
    fn test_empty_path_rejected() {
        let entry = PackedEntry::from_parts(String::new(), Cow::Borrowed(&[]), 0, false, false);

        let res = pack(&[entry], None, &NoCompression);
        assert!(matches!(res, Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_long_path_rejected() {
        let entry = PackedEntry::file("a".repeat(MAX_PATH_LENGTH + 1), Vec::<u8>::new());

        let res = pack(&[entry], None, &NoCompression);
        assert!(matches!(
            res,
            Err(Error::Encoding {
                reason: "path exceeds maximum length",
                ..
            })
        ));
    }

    #[test]
    fn test_root_file_rejected() {
        let entry = PackedEntry::file("/", b"x".as_ref());

        let res = pack(&[entry], None, &NoCompression);
        assert!(matches!(res, Err(Error::Encoding { .. })));

        pack(&[PackedEntry::directory("/")], None, &NoCompression).unwrap();
    }
}
