// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Filesystem geometry and the optional INI config file.
//!
//! Example config:
//!
//! ```ini
//! [geometry]
//! group_size = 16
//! inode_table_size = 512
//!
//! [journal]
//! start = 3749969920
//! end = 3750232056
//! ```

use crate::error::{BlkMapError, ConfigError};
use crate::region::{JournalRange, Lba};
use configparser::ini::Ini;
use std::ops::Range;
use std::path::Path;

/// Layout parameters of the filesystem the dump was taken from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Geometry {
    /// Number of block groups whose bitmaps and inode tables are packed
    /// together (the flex_bg size). Only groups whose index is a
    /// multiple of this are boundary groups, and each packed bitmap
    /// covers this many blocks.
    pub group_size: u64,

    /// Inode table blocks per group.
    pub inode_table_size: u64,
}

impl Geometry {
    pub const DEFAULT_GROUP_SIZE: u64 = 16;
    pub const DEFAULT_INODE_TABLE_SIZE: u64 = 512;

    /// Lines after a boundary group header that may hold its block
    /// bitmap entry.
    pub const BLOCK_BITMAP_WINDOW: Range<usize> = 1..4;

    /// Lines after a boundary group header that may hold its inode
    /// bitmap entry.
    pub const INODE_BITMAP_WINDOW: Range<usize> = 2..5;

    /// Lines after a boundary group header that may hold its inode
    /// table entry.
    pub const INODE_TABLE_WINDOW: Range<usize> = 3..6;

    /// Number of lines that must follow a boundary group header.
    pub const REQUIRED_TRAILING_LINES: usize = 3;

    /// Whether group number `group` is a boundary group.
    pub fn is_boundary_group(&self, group: u64) -> bool {
        group % self.group_size == 0
    }

    /// Blocks covered by one packed block or inode bitmap.
    pub fn bitmap_blocks(&self) -> u64 {
        self.group_size
    }

    /// Blocks covered by one packed inode table.
    pub fn inode_table_blocks(&self) -> u64 {
        self.inode_table_size.saturating_mul(self.group_size)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.group_size == 0 {
            return Err(ConfigError::Zero("geometry.group_size"));
        }
        if self.inode_table_size == 0 {
            return Err(ConfigError::Zero("geometry.inode_table_size"));
        }
        if self.inode_table_size.checked_mul(self.group_size).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "geometry.inode_table_size".to_owned(),
                reason: "packed inode table size overflows".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            group_size: Self::DEFAULT_GROUP_SIZE,
            inode_table_size: Self::DEFAULT_INODE_TABLE_SIZE,
        }
    }
}

/// Settings shared by the extractor and the classifier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Config {
    pub geometry: Geometry,
    pub journal: Option<JournalRange>,
}

impl Config {
    /// Load a config from an INI file. Missing keys keep their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self, BlkMapError> {
        let mut ini = Ini::new();
        ini.load(path).map_err(ConfigError::Load)?;
        Ok(Self::from_ini(&ini)?)
    }

    /// Parse a config from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let mut ini = Ini::new();
        ini.read(text.to_owned()).map_err(ConfigError::Load)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = get_uint(ini, "geometry", "group_size")? {
            config.geometry.group_size = v;
        }
        if let Some(v) = get_uint(ini, "geometry", "inode_table_size")? {
            config.geometry.inode_table_size = v;
        }
        config.geometry.validate()?;

        let start = get_uint(ini, "journal", "start")?;
        let end = get_uint(ini, "journal", "end")?;
        config.journal = match (start, end) {
            (None, None) => None,
            (Some(start), Some(end)) if start <= end => {
                Some(JournalRange { start, end })
            }
            (start, end) => {
                return Err(ConfigError::JournalRange(format!(
                    "{}-{}",
                    fmt_opt(start),
                    fmt_opt(end)
                )));
            }
        };

        Ok(config)
    }

    /// Replace geometry values with any that are set.
    pub fn override_geometry(
        &mut self,
        group_size: Option<u64>,
        inode_table_size: Option<u64>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = group_size {
            self.geometry.group_size = v;
        }
        if let Some(v) = inode_table_size {
            self.geometry.inode_table_size = v;
        }
        self.geometry.validate()
    }
}

fn get_uint(
    ini: &Ini,
    section: &str,
    key: &str,
) -> Result<Option<Lba>, ConfigError> {
    ini.getuint(section, key)
        .map_err(|reason| ConfigError::InvalidValue {
            key: format!("{section}.{key}"),
            reason,
        })
}

fn fmt_opt(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}
