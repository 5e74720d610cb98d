// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::test_util::SMALL_DUMP;
use crate::{load_test_config, load_test_table};
use anyhow::Result;
use blk_map::{
    Geometry, JournalRange, RangeTable, RegionKind, RegionRange, TABLE_HEADER,
    extract_ranges,
};
use std::error::Error;

fn ranges_of(table: &RangeTable, kind: RegionKind) -> Vec<(u64, u64)> {
    table
        .ranges()
        .iter()
        .filter(|r| r.kind == kind)
        .map(|r| (r.start, r.end))
        .collect()
}

#[test]
fn test_config() -> Result<()> {
    let config = load_test_config()?;
    assert_eq!(
        config.geometry,
        Geometry {
            group_size: 16,
            inode_table_size: 512
        }
    );
    assert_eq!(
        config.journal,
        Some(JournalRange {
            start: 262144,
            end: 278527
        })
    );
    Ok(())
}

#[test]
fn test_extract_superblocks() -> Result<()> {
    let table = load_test_table()?;

    // Group 0 plus the sparse_super backups in groups 1, 3, 5, 7 and 9.
    let backups: [u64; 6] = [0, 32768, 98304, 163840, 229376, 294912];
    assert_eq!(
        ranges_of(&table, RegionKind::Superblock),
        backups.map(|b| (b, b))
    );
    assert_eq!(
        ranges_of(&table, RegionKind::GroupDescriptor),
        backups.map(|b| (b + 1, b + 1))
    );
    Ok(())
}

#[test]
fn test_extract_flex_groups() -> Result<()> {
    let table = load_test_table()?;

    // One entry per flex group, covering all sixteen groups.
    assert_eq!(
        ranges_of(&table, RegionKind::BlockBitmap),
        [(641, 656), (524288, 524303)]
    );
    assert_eq!(
        ranges_of(&table, RegionKind::InodeBitmap),
        [(657, 672), (524304, 524319)]
    );
    assert_eq!(
        ranges_of(&table, RegionKind::InodeTable),
        [(673, 8864), (524320, 532511)]
    );
    Ok(())
}

#[test]
fn test_extract_order() -> Result<()> {
    let table = load_test_table()?;
    assert_eq!(table.ranges().len(), 18);

    // Grouped by kind.
    let codes: Vec<u8> = table.ranges().iter().map(|r| r.kind.code()).collect();
    let mut sorted = codes.clone();
    sorted.sort();
    assert_eq!(codes, sorted);

    for range in table.ranges() {
        assert!(range.start <= range.end, "{range}");
    }
    Ok(())
}

#[test]
fn test_save_and_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("blk_map.txt");

    let table = load_test_table()?;
    table.save(&path)?;

    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with(TABLE_HEADER));
    assert!(text.ends_with("\nJ 262144 278527\n"));
    assert_eq!(RangeTable::load(&path)?, table);
    Ok(())
}

#[test]
fn test_load_legacy() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("blk_map.txt");

    // Legacy tables have no header and end with the journal range,
    // tagged with whatever number the last group happened to have.
    let table = load_test_table()?;
    let mut legacy = String::new();
    for range in table.ranges() {
        legacy.push_str(&format!("{range}\n"));
    }
    legacy.push_str("6 262144 278527\n");
    std::fs::write(&path, legacy)?;

    assert_eq!(RangeTable::load(&path)?, table);
    Ok(())
}

#[test]
fn test_load_missing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = RangeTable::load(&dir.path().join("missing.txt")).unwrap_err();
    assert_eq!(err.to_string(), "io error");
    let source = err.source().unwrap().downcast_ref::<std::io::Error>();
    assert_eq!(source.unwrap().kind(), std::io::ErrorKind::NotFound);
    Ok(())
}

#[test]
fn test_group_size_changes_lengths() {
    let geometry = Geometry {
        group_size: 8,
        inode_table_size: 256,
    };
    let ranges = extract_ranges(SMALL_DUMP, geometry).unwrap();
    assert_eq!(
        ranges[2..],
        [
            RegionRange {
                kind: RegionKind::BlockBitmap,
                start: 100,
                end: 107
            },
            RegionRange {
                kind: RegionKind::InodeBitmap,
                start: 116,
                end: 123
            },
            RegionRange {
                kind: RegionKind::InodeTable,
                start: 200,
                end: 2247
            },
        ]
    );
}
