// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsing of packed resources blobs. */

use {
    crate::{
        compression::Compression,
        entry::PackedEntry,
        error::{Error, Result},
        path::{normalize, ROOT},
        serialization::{flag_from_u8, GLOBAL_HEADER_LENGTH, HEADER_V1},
    },
    byteorder::{LittleEndian, ReadBytesExt},
    std::{borrow::Cow, io::Cursor},
};

/// An iterator over an actively parsed packed resources blob.
///
/// The iterator emits [PackedEntry] instances in blob order. A record is not
/// read or validated until the iterator reaches it, so a corrupt record only
/// surfaces once iteration gets that far.
///
/// Uncompressed content borrows from the blob. Compressed content is
/// decompressed with the supplied [Compression] when its record is read.
pub struct EntryParser<'a, 'c> {
    done: bool,
    data: &'a [u8],
    reader: Cursor<&'a [u8]>,
    compression: &'c dyn Compression,
    claimed_entries_count: usize,
    read_entries_count: usize,
}

impl<'a, 'c> EntryParser<'a, 'c> {
    /// The number of entries advertised by the blob header.
    pub fn expected_entries_count(&self) -> usize {
        self.claimed_entries_count
    }

    /// Claim the next `length` bytes of the blob.
    fn take(&mut self, length: u64) -> Result<&'a [u8]> {
        let start = self.reader.position() as usize;
        let remaining = (self.data.len() - start) as u64;

        if length > remaining {
            return Err(Error::CorruptBlob("entry data extends past end of blob"));
        }

        let end = start + length as usize;
        self.reader.set_position(end as u64);

        Ok(&self.data[start..end])
    }

    fn read_flag(&mut self, what: &'static str) -> Result<bool> {
        let value = self.reader.read_u8().map_err(|_| Error::CorruptBlob(what))?;

        flag_from_u8(value).map_err(Error::CorruptBlob)
    }

    fn parse_next(&mut self) -> Result<PackedEntry<'a>> {
        let path_length = self
            .reader
            .read_u16::<LittleEndian>()
            .map_err(|_| Error::CorruptBlob("failed reading path length"))?;

        if path_length == 0 {
            return Err(Error::CorruptBlob("entry path is empty"));
        }

        let path = std::str::from_utf8(self.take(path_length as u64)?)
            .map_err(|_| Error::CorruptBlob("entry path is not valid UTF-8"))?;

        let is_dir = self.read_flag("failed reading directory flag")?;

        let size = self
            .reader
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::CorruptBlob("failed reading size"))?;
        let mod_time = self
            .reader
            .read_i64::<LittleEndian>()
            .map_err(|_| Error::CorruptBlob("failed reading modification time"))?;

        let compressed = self.read_flag("failed reading compression flag")?;

        let content_length = self
            .reader
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::CorruptBlob("failed reading content length"))?;
        let stored = self.take(content_length)?;

        if is_dir && (size != 0 || !stored.is_empty()) {
            return Err(Error::CorruptBlob("directory entry has content"));
        }

        let content = if compressed {
            let data = self
                .compression
                .decompress(stored, size as usize)
                .map_err(|source| Error::Decompression {
                    path: path.to_string(),
                    source,
                })?;

            if data.len() as u64 != size {
                return Err(Error::Decompression {
                    path: path.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "decompressed {} bytes but expected {}",
                            data.len(),
                            size
                        ),
                    ),
                });
            }

            Cow::Owned(data)
        } else {
            if stored.len() as u64 != size {
                return Err(Error::CorruptBlob("content length does not match size"));
            }

            Cow::Borrowed(stored)
        };

        let path = normalize(path);
        if path == ROOT && !is_dir {
            return Err(Error::CorruptBlob("file entry at root path"));
        }

        Ok(PackedEntry::from_parts(
            path,
            content,
            mod_time,
            is_dir,
            compressed,
        ))
    }
}

impl<'a, 'c> Iterator for EntryParser<'a, 'c> {
    type Item = Result<PackedEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.read_entries_count == self.claimed_entries_count {
            self.done = true;

            return if (self.reader.position() as usize) < self.data.len() {
                Some(Err(Error::CorruptBlob("trailing data after final entry")))
            } else {
                None
            };
        }

        self.read_entries_count += 1;

        match self.parse_next() {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse a packed resources blob.
///
/// The header is validated eagerly. Entries are parsed lazily via the
/// returned iterator.
pub fn parse_entries<'a, 'c>(
    data: &'a [u8],
    compression: &'c dyn Compression,
) -> Result<EntryParser<'a, 'c>> {
    if data.len() < HEADER_V1.len() {
        return Err(Error::CorruptBlob("error reading 8 byte header"));
    }

    if &data[0..HEADER_V1.len()] != HEADER_V1 {
        return Err(Error::CorruptBlob("unrecognized file format"));
    }

    if data.len() < GLOBAL_HEADER_LENGTH {
        return Err(Error::CorruptBlob("failed reading entry count"));
    }

    let mut reader = Cursor::new(data);
    reader.set_position(HEADER_V1.len() as u64);

    let claimed_entries_count = reader
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::CorruptBlob("failed reading entry count"))?
        as usize;

    Ok(EntryParser {
        done: false,
        data,
        reader,
        compression,
        claimed_entries_count,
        read_entries_count: 0,
    })
}

/// Parse a packed resources blob into a vector of entries.
///
/// Fails on the first error encountered.
pub fn unpack<'a>(data: &'a [u8], compression: &dyn Compression) -> Result<Vec<PackedEntry<'a>>> {
    parse_entries(data, compression)?.collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            compression::{NoCompression, ZlibCompression},
            writer::pack,
        },
        byteorder::WriteBytesExt,
        std::io::Write,
    };

    fn sample_entries() -> Vec<PackedEntry<'static>> {
        vec![
            PackedEntry::directory("/a").with_mod_time(10),
            PackedEntry::file("/a/x.txt", b"hello".as_ref()).with_mod_time(11),
            PackedEntry::file("/a/y.log", b"log line\n".repeat(20)).with_compression(true),
            PackedEntry::file("/empty", Vec::<u8>::new()).with_mod_time(-5),
        ]
    }

    #[test]
    fn test_too_short_header() {
        let res = unpack(b"foo", &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("error reading 8 byte header"))
        ));
    }

    #[test]
    fn test_unrecognized_header() {
        let res = unpack(b"packdfs\x00\x00\x00\x00\x00", &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("unrecognized file format"))
        ));

        let res = unpack(b"packdfs\x02\x00\x00\x00\x00", &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("unrecognized file format"))
        ));
    }

    #[test]
    fn test_missing_count() {
        let res = unpack(b"packdfs\x01\x00", &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("failed reading entry count"))
        ));
    }

    #[test]
    fn test_no_entries() -> Result<()> {
        let entries = unpack(b"packdfs\x01\x00\x00\x00\x00", &NoCompression)?;
        assert!(entries.is_empty());

        Ok(())
    }

    #[test]
    fn test_count_mismatch() {
        let res = unpack(b"packdfs\x01\x01\x00\x00\x00", &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("failed reading path length"))
        ));
    }

    #[test]
    fn test_trailing_data() {
        let res = unpack(b"packdfs\x01\x00\x00\x00\x00\xff", &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("trailing data after final entry"))
        ));
    }

    #[test]
    fn test_truncated_content() -> Result<()> {
        let mut data = pack(
            &[PackedEntry::file("x", b"hello".as_ref())],
            None,
            &NoCompression,
        )?;
        data.truncate(data.len() - 2);

        let res = unpack(&data, &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("entry data extends past end of blob"))
        ));

        Ok(())
    }

    #[test]
    fn test_invalid_flag() -> Result<()> {
        let mut data = b"packdfs\x01".to_vec();
        data.write_u32::<LittleEndian>(1)?;
        data.write_u16::<LittleEndian>(2)?;
        data.write_all(b"/x")?;
        data.write_u8(7)?;

        let res = unpack(&data, &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("invalid value for boolean field"))
        ));

        Ok(())
    }

    #[test]
    fn test_invalid_utf8_path() -> Result<()> {
        let mut data = b"packdfs\x01".to_vec();
        data.write_u32::<LittleEndian>(1)?;
        data.write_u16::<LittleEndian>(2)?;
        data.write_all(&[0xff, 0xfe])?;

        let res = unpack(&data, &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("entry path is not valid UTF-8"))
        ));

        Ok(())
    }

    fn single_record(path: &[u8], is_dir: u8, content: &[u8]) -> Result<Vec<u8>> {
        let mut data = b"packdfs\x01".to_vec();
        data.write_u32::<LittleEndian>(1)?;
        data.write_u16::<LittleEndian>(path.len() as u16)?;
        data.write_all(path)?;
        data.write_u8(is_dir)?;
        data.write_u64::<LittleEndian>(content.len() as u64)?;
        data.write_i64::<LittleEndian>(0)?;
        data.write_u8(0)?;
        data.write_u64::<LittleEndian>(content.len() as u64)?;
        data.write_all(content)?;

        Ok(data)
    }

    #[test]
    fn test_paths_normalized() -> Result<()> {
        let data = single_record(b"a\\b//c.txt", 0, b"c")?;
        let entries = unpack(&data, &NoCompression)?;
        assert_eq!(entries[0].path(), "/a/b/c.txt");

        let data = single_record(b"./", 0, b"c")?;
        assert!(matches!(
            unpack(&data, &NoCompression),
            Err(Error::CorruptBlob("file entry at root path"))
        ));

        let data = single_record(b"/", 1, b"")?;
        assert!(unpack(&data, &NoCompression)?[0].is_dir());

        Ok(())
    }

    #[test]
    fn test_oversized_decompression_rejected() -> Result<()> {
        let codec = ZlibCompression::default();
        let payload = codec.compress(&vec![0u8; 8 * 1024 * 1024])?;

        let mut data = b"packdfs\x01".to_vec();
        data.write_u32::<LittleEndian>(1)?;
        data.write_u16::<LittleEndian>(2)?;
        data.write_all(b"/x")?;
        data.write_u8(0)?;
        data.write_u64::<LittleEndian>(1)?;
        data.write_i64::<LittleEndian>(0)?;
        data.write_u8(1)?;
        data.write_u64::<LittleEndian>(payload.len() as u64)?;
        data.write_all(&payload)?;

        match unpack(&data, &codec) {
            Err(Error::Decompression { path, source }) => {
                assert_eq!(path, "/x");
                assert_eq!(source.to_string(), "decompressed 2 bytes but expected 1");
            }
            res => panic!("unexpected result: {:?}", res),
        }

        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<()> {
        let mut data = b"packdfs\x01".to_vec();
        data.write_u32::<LittleEndian>(1)?;
        data.write_u16::<LittleEndian>(2)?;
        data.write_all(b"/x")?;
        data.write_u8(0)?;
        data.write_u64::<LittleEndian>(10)?;
        data.write_i64::<LittleEndian>(0)?;
        data.write_u8(0)?;
        data.write_u64::<LittleEndian>(3)?;
        data.write_all(b"abc")?;

        let res = unpack(&data, &NoCompression);
        assert!(matches!(
            res,
            Err(Error::CorruptBlob("content length does not match size"))
        ));

        Ok(())
    }

    #[test]
    fn test_malformed_compressed_payload() -> Result<()> {
        let mut data = b"packdfs\x01".to_vec();
        data.write_u32::<LittleEndian>(1)?;
        data.write_u16::<LittleEndian>(2)?;
        data.write_all(b"/x")?;
        data.write_u8(0)?;
        data.write_u64::<LittleEndian>(5)?;
        data.write_i64::<LittleEndian>(0)?;
        data.write_u8(1)?;
        data.write_u64::<LittleEndian>(5)?;
        data.write_all(b"bogus")?;

        let res = unpack(&data, &ZlibCompression::default());
        match res {
            Err(Error::Decompression { path, .. }) => assert_eq!(path, "/x"),
            other => panic!("unexpected result: {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let codec = ZlibCompression::default();
        let entries = sample_entries();

        let data = pack(&entries, None, &codec)?;
        let parsed = unpack(&data, &codec)?;

        assert_eq!(parsed, entries);

        Ok(())
    }

    #[test]
    fn test_uncompressed_content_borrows() -> Result<()> {
        let data = pack(&sample_entries(), None, &NoCompression)?;
        let parsed = unpack(&data, &NoCompression)?;

        let content = parsed[1].content();
        let blob_range = data.as_ptr_range();
        assert!(blob_range.contains(&content.as_ptr()));

        Ok(())
    }

    #[test]
    fn test_lazy_iteration() -> Result<()> {
        let mut data = pack(&sample_entries(), None, &ZlibCompression::default())?;
        data.push(0);

        let codec = ZlibCompression::default();
        let mut parser = parse_entries(&data, &codec)?;
        assert_eq!(parser.expected_entries_count(), 4);

        for _ in 0..4 {
            assert!(matches!(parser.next(), Some(Ok(_))));
        }
        assert!(matches!(parser.next(), Some(Err(Error::CorruptBlob(_)))));
        assert!(parser.next().is_none());

        Ok(())
    }
}
