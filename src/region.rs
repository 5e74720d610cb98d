// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::ConfigError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Absolute block address on the traced device.
pub type Lba = u64;

/// Structural region of an ext4 filesystem.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RegionKind {
    Superblock,
    GroupDescriptor,
    BlockBitmap,
    InodeBitmap,
    InodeTable,
}

impl RegionKind {
    /// All kinds, in kind-code order.
    pub const ALL: [Self; 5] = [
        Self::Superblock,
        Self::GroupDescriptor,
        Self::BlockBitmap,
        Self::InodeBitmap,
        Self::InodeTable,
    ];

    /// Numeric code used in the range table.
    pub const fn code(self) -> u8 {
        match self {
            Self::Superblock => 1,
            Self::GroupDescriptor => 2,
            Self::BlockBitmap => 3,
            Self::InodeBitmap => 4,
            Self::InodeTable => 5,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Superblock),
            2 => Some(Self::GroupDescriptor),
            3 => Some(Self::BlockBitmap),
            4 => Some(Self::InodeBitmap),
            5 => Some(Self::InodeTable),
            _ => None,
        }
    }

    /// Two-letter abbreviation used in summaries.
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Superblock => "SB",
            Self::GroupDescriptor => "GD",
            Self::BlockBitmap => "BB",
            Self::InodeBitmap => "IB",
            Self::InodeTable => "IT",
        }
    }
}

/// Counter bucket an access is tallied under.
///
/// In addition to the structural regions, there are three buckets for
/// accesses that don't land in a known region.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Bucket {
    Region(RegionKind),

    /// Qualified access that matched no region. This covers addresses
    /// below the lowest region as well as addresses in a gap between
    /// regions.
    DataEarly,

    /// Unqualified access outside the journal.
    DataAhead,

    /// Unqualified write inside the journal. Write-side only.
    DataJournal,
}

impl Bucket {
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Region(kind) => kind.abbrev(),
            Self::DataEarly => "DE",
            Self::DataAhead => "DA",
            Self::DataJournal => "DJ",
        }
    }
}

impl Display for Bucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// Inclusive block range occupied by one structural element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegionRange {
    pub kind: RegionKind,
    pub start: Lba,
    pub end: Lba,
}

impl RegionRange {
    pub fn contains(&self, lba: Lba) -> bool {
        self.start <= lba && lba <= self.end
    }

    /// Number of blocks in the range. Saturates for the one range,
    /// `0..=u64::MAX`, whose length does not fit.
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }
}

impl Display for RegionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind.code(), self.start, self.end)
    }
}

/// Inclusive block range of the filesystem journal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JournalRange {
    pub start: Lba,
    pub end: Lba,
}

impl JournalRange {
    pub fn contains(&self, lba: Lba) -> bool {
        self.start <= lba && lba <= self.end
    }
}

impl FromStr for JournalRange {
    type Err = ConfigError;

    /// Parse a range of the form `START-END`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ConfigError::JournalRange(s.to_owned());

        let (start, end) = s.trim().split_once('-').ok_or_else(err)?;
        let start: Lba = start.trim().parse().map_err(|_| err())?;
        let end: Lba = end.trim().parse().map_err(|_| err())?;
        if start > end {
            return Err(err());
        }
        Ok(Self { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for kind in RegionKind::ALL {
            assert_eq!(RegionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(RegionKind::from_code(0), None);
        assert_eq!(RegionKind::from_code(6), None);
    }

    #[test]
    fn test_region_contains() {
        let range = RegionRange {
            kind: RegionKind::BlockBitmap,
            start: 100,
            end: 115,
        };
        assert!(!range.contains(99));
        assert!(range.contains(100));
        assert!(range.contains(115));
        assert!(!range.contains(116));
        assert_eq!(range.len(), 16);
        assert_eq!(range.to_string(), "3 100 115");
    }

    #[test]
    fn test_journal_from_str() {
        assert_eq!(
            "3749969920-3750232056".parse::<JournalRange>().unwrap(),
            JournalRange {
                start: 3749969920,
                end: 3750232056
            }
        );
        assert_eq!(
            " 7 - 7 ".parse::<JournalRange>().unwrap(),
            JournalRange { start: 7, end: 7 }
        );
        assert_eq!(
            "10-5".parse::<JournalRange>(),
            Err(ConfigError::JournalRange("10-5".to_owned()))
        );
        assert!("10".parse::<JournalRange>().is_err());
        assert!("a-b".parse::<JournalRange>().is_err());
    }

    #[test]
    fn test_bucket_abbrev() {
        assert_eq!(Bucket::Region(RegionKind::InodeTable).to_string(), "IT");
        assert_eq!(Bucket::DataEarly.to_string(), "DE");
        assert_eq!(Bucket::DataAhead.to_string(), "DA");
        assert_eq!(Bucket::DataJournal.to_string(), "DJ");
    }
}
