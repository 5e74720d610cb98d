// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Extract metadata ranges from a `dumpe2fs` report.
//!
//! The report is matched positionally. The relevant lines look like
//! this:
//!
//! ```text
//! Group 0: (Blocks 0-32767) csum 0x8d3c [ITABLE_ZEROED]
//!   Primary superblock at 0, Group descriptors at 1-1
//!   Reserved GDT blocks at 2-1024
//!   Block bitmap at 1025 (+1025), csum 0x4d0f1c3a
//!   Inode bitmap at 1041 (+1041), csum 0x2a1d7c55
//!   Inode table at 1057-1568 (+1057)
//! ```
//!
//! Superblock and descriptor lines are recognized anywhere. Bitmap and
//! inode table lines are only looked for in a small window after the
//! header of a boundary group (see [`Geometry`]); with `flex_bg` the
//! boundary group's entries are the start of the packed area for the
//! whole flex group.

use crate::error::{BlkMapError, Malformed};
use crate::geometry::Geometry;
use crate::region::{Lba, RegionKind, RegionRange};
use std::ops::Range;
use tracing::{debug, info};

/// Lines with this many fields or fewer are never section lines.
const MIN_SECTION_FIELDS: usize = 6;

/// Line scanner over a `dumpe2fs` report.
pub struct DumpScanner<'a> {
    lines: Vec<&'a str>,
    geometry: Geometry,
}

impl<'a> DumpScanner<'a> {
    pub fn new(text: &'a str, geometry: Geometry) -> Self {
        Self {
            lines: text.lines().collect(),
            geometry,
        }
    }

    /// Scan the whole report.
    ///
    /// The returned ranges are grouped by kind, in kind-code order, and
    /// within a kind appear in the order they occur in the report.
    ///
    /// Lines that don't match any section are skipped. A boundary group
    /// header followed by fewer than
    /// [`Geometry::REQUIRED_TRAILING_LINES`] lines is an error.
    pub fn scan(&self) -> Result<Vec<RegionRange>, BlkMapError> {
        self.geometry.validate()?;
        let mut ranges = Vec::new();

        for (index, line) in self.lines.iter().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < MIN_SECTION_FIELDS {
                continue;
            }

            // The primary/backup superblock line also carries the
            // descriptor range, so both checks apply to every line.
            if let Some(range) = superblock(&fields) {
                ranges.push(range);
            }
            if let Some(range) = descriptors(&fields) {
                ranges.push(range);
            }
            if let Some(group) = group_header(&fields) {
                if self.geometry.is_boundary_group(group) {
                    self.scan_boundary_group(group, index, &mut ranges)?;
                }
            }
        }

        // Stable, so line order is kept within each kind.
        ranges.sort_by_key(|range| range.kind);

        for range in &ranges {
            debug!(kind = range.kind.abbrev(), range.start, range.end, "range");
        }
        info!(count = ranges.len(), "extracted metadata ranges");

        Ok(ranges)
    }

    fn scan_boundary_group(
        &self,
        group: u64,
        header_index: usize,
        ranges: &mut Vec<RegionRange>,
    ) -> Result<(), BlkMapError> {
        if header_index + Geometry::REQUIRED_TRAILING_LINES >= self.lines.len()
        {
            return Err(BlkMapError::TruncatedGroup {
                group,
                line: header_index + 1,
            });
        }

        let bitmap_blocks = self.geometry.bitmap_blocks();

        for (index, start) in
            self.window(header_index, Geometry::BLOCK_BITMAP_WINDOW, |f| {
                f[0] == "Block"
            })
        {
            ranges.push(span(
                RegionKind::BlockBitmap,
                index,
                start,
                bitmap_blocks,
            )?);
        }

        for (index, start) in
            self.window(header_index, Geometry::INODE_BITMAP_WINDOW, |f| {
                f[..2] == ["Inode", "bitmap"]
            })
        {
            ranges.push(span(
                RegionKind::InodeBitmap,
                index,
                start,
                bitmap_blocks,
            )?);
        }

        for (index, start) in
            self.window(header_index, Geometry::INODE_TABLE_WINDOW, |f| {
                f[..2] == ["Inode", "table"]
            })
        {
            ranges.push(span(
                RegionKind::InodeTable,
                index,
                start,
                self.geometry.inode_table_blocks(),
            )?);
        }

        Ok(())
    }

    /// Get the line indices and start addresses of lines in `offsets`
    /// (relative to `header_index`) accepted by `matches`.
    ///
    /// The address is the fourth field; for a range such as
    /// `1057-1568` only the start is used. The window is clipped to the
    /// end of the report.
    fn window(
        &self,
        header_index: usize,
        offsets: Range<usize>,
        matches: impl Fn(&[&str]) -> bool,
    ) -> Vec<(usize, Lba)> {
        let end = (header_index + offsets.end).min(self.lines.len());
        let start = (header_index + offsets.start).min(end);

        self.lines[start..end]
            .iter()
            .enumerate()
            .filter_map(|(i, line)| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 4 || !matches(&fields) {
                    return None;
                }
                let addr = fields[3].split('-').next()?;
                let addr = parse_lba(addr);
                if addr.is_none() {
                    debug!(line, "skipping entry with invalid address");
                }
                addr.map(|addr| (start + i, addr))
            })
            .collect()
    }
}

/// Extract all metadata ranges from the text of a `dumpe2fs` report.
pub fn extract_ranges(
    text: &str,
    geometry: Geometry,
) -> Result<Vec<RegionRange>, BlkMapError> {
    DumpScanner::new(text, geometry).scan()
}

/// Match `Primary superblock at 0, Group descriptors at 1-1`.
fn superblock(fields: &[&str]) -> Option<RegionRange> {
    if fields[1] != "superblock" {
        return None;
    }
    let block = parse_lba(fields[3].trim_end_matches(','))?;
    Some(RegionRange {
        kind: RegionKind::Superblock,
        start: block,
        end: block,
    })
}

/// Match the descriptor range at the end of a superblock line.
fn descriptors(fields: &[&str]) -> Option<RegionRange> {
    if fields[4] != "Group" {
        return None;
    }
    let last = fields.last()?;
    let (start, end) = match last.split_once('-') {
        Some((start, end)) => (parse_lba(start)?, parse_lba(end)?),
        None => {
            let block = parse_lba(last)?;
            (block, block)
        }
    };
    if start > end {
        return None;
    }
    Some(RegionRange {
        kind: RegionKind::GroupDescriptor,
        start,
        end,
    })
}

/// Match `Group 16: (Blocks 524288-557055) ...` and get the group
/// number.
fn group_header(fields: &[&str]) -> Option<u64> {
    if fields[0] != "Group" {
        return None;
    }
    fields[1].strip_suffix(':')?.parse().ok()
}

/// Range of `blocks` blocks from `start`. `index` is the 0-based line
/// the entry came from.
fn span(
    kind: RegionKind,
    index: usize,
    start: Lba,
    blocks: u64,
) -> Result<RegionRange, Malformed> {
    let end = blocks
        .checked_sub(1)
        .and_then(|n| start.checked_add(n))
        .ok_or(Malformed::DumpRange(index + 1))?;
    Ok(RegionRange { kind, start, end })
}

fn parse_lba(s: &str) -> Option<Lba> {
    s.parse().ok()
}
