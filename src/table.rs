// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Persisted range table.
//!
//! Current format, one record per line:
//!
//! ```text
//! # blk-map v2
//! 1 0 0
//! 2 1 1
//! 3 641 656
//! J 262144 278527
//! ```
//!
//! Files without the header line use the legacy format, in which the
//! last line always holds the journal range in its last two fields,
//! whatever its first field says.

use crate::error::{BlkMapError, Malformed};
use crate::region::{Bucket, JournalRange, Lba, RegionKind, RegionRange};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use tracing::warn;

/// First line of a range table in the current format.
pub const TABLE_HEADER: &str = "# blk-map v2";

/// Tag of the journal record.
const JOURNAL_TAG: &str = "J";

/// Metadata ranges of a filesystem, plus its journal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RangeTable {
    ranges: Vec<RegionRange>,
    journal: Option<JournalRange>,
}

impl RangeTable {
    pub fn new(ranges: Vec<RegionRange>, journal: Option<JournalRange>) -> Self {
        Self { ranges, journal }
    }

    pub fn ranges(&self) -> &[RegionRange] {
        &self.ranges
    }

    pub fn journal(&self) -> Option<JournalRange> {
        self.journal
    }

    pub fn set_journal(&mut self, journal: Option<JournalRange>) {
        self.journal = journal;
    }

    /// Sort ranges by start address. Ranges with the same start keep
    /// their relative order.
    pub fn sort_by_start(&mut self) {
        self.ranges.sort_by_key(|range| range.start);
    }

    /// Get the bucket for a qualified access at `lba`.
    ///
    /// This is the kind of the first range containing `lba`, or
    /// [`Bucket::DataEarly`] if there is none. For overlapping ranges
    /// the result depends on the current order, so call
    /// [`sort_by_start`] first.
    ///
    /// [`sort_by_start`]: Self::sort_by_start
    pub fn classify(&self, lba: Lba) -> Bucket {
        self.ranges
            .iter()
            .find(|range| range.contains(lba))
            .map(|range| Bucket::Region(range.kind))
            .unwrap_or(Bucket::DataEarly)
    }

    /// Parse a range table in either format.
    pub fn parse(text: &str) -> Result<Self, Malformed> {
        // Line numbers are kept for errors.
        let lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let is_current = lines
            .clone()
            .next()
            .is_some_and(|(_, line)| line == TABLE_HEADER);

        let records: Vec<(usize, &str)> =
            lines.filter(|(_, line)| !line.starts_with('#')).collect();

        if is_current {
            Self::parse_current(&records)
        } else {
            Self::parse_legacy(&records)
        }
    }

    fn parse_current(records: &[(usize, &str)]) -> Result<Self, Malformed> {
        let mut table = Self::default();
        for &(line_num, line) in records {
            let (tag, start, end) = split_record(line_num, line)?;
            if tag == JOURNAL_TAG {
                table.journal = Some(JournalRange { start, end });
            } else {
                table.ranges.push(region(line_num, tag, start, end)?);
            }
        }
        Ok(table)
    }

    fn parse_legacy(records: &[(usize, &str)]) -> Result<Self, Malformed> {
        let Some((&(last_num, last), rest)) = records.split_last() else {
            return Err(Malformed::EmptyTable);
        };
        warn!(
            line = last_num,
            "range table has no header, reading the journal range from its last line"
        );

        let (_, start, end) = split_record(last_num, last)?;
        let mut table = Self {
            ranges: Vec::with_capacity(rest.len()),
            journal: Some(JournalRange { start, end }),
        };
        for &(line_num, line) in rest {
            let (tag, start, end) = split_record(line_num, line)?;
            table.ranges.push(region(line_num, tag, start, end)?);
        }
        Ok(table)
    }

    /// Load a range table from a file.
    pub fn load(path: &Path) -> Result<Self, BlkMapError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Write the table to a file in the current format, replacing any
    /// existing content.
    pub fn save(&self, path: &Path) -> Result<(), BlkMapError> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl Display for RangeTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TABLE_HEADER}")?;
        for range in &self.ranges {
            writeln!(f, "{range}")?;
        }
        if let Some(journal) = self.journal {
            writeln!(f, "{JOURNAL_TAG} {} {}", journal.start, journal.end)?;
        }
        Ok(())
    }
}

/// Split `<tag> <start> <end>`. Fields past the third are ignored.
fn split_record(
    line_num: usize,
    line: &str,
) -> Result<(&str, Lba, Lba), Malformed> {
    let mut fields = line.split_whitespace();
    let (Some(tag), Some(start), Some(end)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(Malformed::TableRecord(line_num));
    };
    let start: Lba =
        start.parse().map_err(|_| Malformed::TableRecord(line_num))?;
    let end: Lba = end.parse().map_err(|_| Malformed::TableRecord(line_num))?;
    if start > end {
        return Err(Malformed::TableRange(line_num));
    }
    Ok((tag, start, end))
}

fn region(
    line_num: usize,
    tag: &str,
    start: Lba,
    end: Lba,
) -> Result<RegionRange, Malformed> {
    let kind = tag
        .parse::<u8>()
        .ok()
        .and_then(RegionKind::from_code)
        .ok_or_else(|| Malformed::TableKind {
            line: line_num,
            code: tag.to_owned(),
        })?;
    Ok(RegionRange { kind, start, end })
}
