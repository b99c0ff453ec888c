// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Declares the foundational data primitives inside packed resources blobs.

A blob consists of a fixed header followed by entry records, all integers
little-endian:

```text
header:  b"packdfs\x01"  u32 entry_count
record:  u16 path_len  path  u8 is_dir  u64 size  i64 mod_time
         u8 compressed  u64 content_len  content
```

No data may follow the final record.
*/

/// Header value for version 1 of the blob format.
///
/// The trailing byte is the format version.
pub const HEADER_V1: &[u8] = b"packdfs\x01";

/// Length of the global header: magic plus entry count.
pub const GLOBAL_HEADER_LENGTH: usize = 8 + 4;

/// Maximum length in bytes of an encoded entry path.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Encode a boolean field.
pub fn flag_to_u8(value: bool) -> u8 {
    if value {
        0x01
    } else {
        0x00
    }
}

/// Decode a boolean field, rejecting anything but 0 or 1.
pub fn flag_from_u8(value: u8) -> Result<bool, &'static str> {
    match value {
        0x00 => Ok(false),
        0x01 => Ok(true),
        _ => Err("invalid value for boolean field"),
    }
}
