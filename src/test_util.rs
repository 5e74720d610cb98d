// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// In addition to being used as a regular module in lib.rs, this module
// is used in `tests` via the `include!` macro.

use std::path::PathBuf;

/// Report with a single boundary group.
pub(crate) const SMALL_DUMP: &str = "\
Group 0: (Blocks 0-32767) csum 0x1234 [ITABLE_ZEROED]
  Primary superblock at 1, Group descriptors at 50-60
  Reserved GDT blocks at 61-99
  Block bitmap at 100 (+100), csum 0x00000000
  Inode bitmap at 116 (+116), csum 0x00000000
  Inode table at 200-711 (+200)
  23513 free blocks, 8181 free inodes, 2 directories, 8181 unused inodes
  Free blocks: 9255-32767
  Free inodes: 12-8192
";

/// Get the path of a file in the `test_data` directory.
#[allow(dead_code)]
pub(crate) fn test_data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(name)
}
