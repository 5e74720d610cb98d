// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This crate classifies block I/O traces by the ext4 metadata region
//! each access lands in.
//!
//! It works in two steps:
//!
//! 1. [`extract_ranges`] reads a `dumpe2fs` report and finds the block
//!    ranges of the superblocks, group descriptors, block and inode
//!    bitmaps, and inode tables. Together with the journal range these
//!    make up a [`RangeTable`], which is saved as a small text file.
//! 2. [`classify_trace`] reads a trace of `<op> <lba> <count>` lines and
//!    tallies the blocks accessed per region into [`Counters`].
//!
//! # Example
//!
//! ```
//! use blk_map::{Geometry, RangeTable, classify_trace, extract_ranges};
//!
//! let dump = "\
//! Group 0: (Blocks 0-32767) csum 0x1234 [ITABLE_ZEROED]
//!   Primary superblock at 1, Group descriptors at 50-60
//!   Reserved GDT blocks at 61-99
//!   Block bitmap at 100 (+100), csum 0x00000000
//!   Inode bitmap at 116 (+116), csum 0x00000000
//!   Inode table at 200-711 (+200)
//! ";
//! let ranges = extract_ranges(dump, Geometry::default())?;
//! let table = RangeTable::new(ranges, None);
//!
//! let counters = classify_trace(table, "WM 50 2\nD 9999 5\n")?;
//! assert_eq!(
//!     counters.to_string(),
//!     "0\t0\t0\t0\t0\t0\t0\t0\t2\t0\t0\t0\t0\t0\t0\t5"
//! );
//! # Ok::<(), blk_map::BlkMapError>(())
//! ```

#![forbid(unsafe_code)]

mod classify;
mod dump;
mod error;
mod geometry;
mod io_count;
mod region;
mod table;
mod trace;

#[cfg(test)]
mod test_util;

pub use classify::{
    Classifier, Counters, READ_BUCKETS, SUMMARY_FIELDS, WRITE_BUCKETS,
    classify_trace,
};
pub use dump::{DumpScanner, extract_ranges};
pub use error::{BlkMapError, ConfigError, Malformed};
pub use geometry::{Config, Geometry};
pub use io_count::{IoCount, Tally, count_trace};
pub use region::{Bucket, JournalRange, Lba, RegionKind, RegionRange};
pub use table::{RangeTable, TABLE_HEADER};
pub use trace::{Direction, OpQualifiers, TraceEntry, parse_trace};
