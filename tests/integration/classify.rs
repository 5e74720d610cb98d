// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::{load_test_table, load_test_trace};
use anyhow::{Context, Result};
use blk_map::{
    Bucket, Classifier, Malformed, RangeTable, RegionKind, SUMMARY_FIELDS,
    classify_trace, parse_trace,
};

const EXPECTED_SUMMARY: &str =
    "1\t1\t0\t1\t9\t2\t20\t1\t2\t3\t1\t4\t3\t32\t11\t264";

#[test]
fn test_classify_trace() -> Result<()> {
    let counters = classify_trace(load_test_table()?, &load_test_trace()?)?;
    assert_eq!(counters.to_string(), EXPECTED_SUMMARY);

    let it = Bucket::Region(RegionKind::InodeTable);
    assert_eq!(counters.read(it), 9);
    assert_eq!(counters.write(it), 4);
    assert_eq!(counters.write(Bucket::DataJournal), 11);
    Ok(())
}

#[test]
fn test_total_matches_trace() -> Result<()> {
    let trace = load_test_trace()?;
    let expected = parse_trace(&trace)
        .map(|item| item.map(|(_, entry)| entry.count))
        .sum::<Result<u64, Malformed>>()?;

    let counters = classify_trace(load_test_table()?, &trace)?;
    assert_eq!(counters.total(), expected);
    assert_eq!(counters.fields().iter().sum::<u64>(), expected);
    assert_eq!(counters.fields().len(), SUMMARY_FIELDS);
    Ok(())
}

#[test]
fn test_legacy_table_gives_same_summary() -> Result<()> {
    let table = load_test_table()?;
    let mut legacy = String::new();
    for range in table.ranges() {
        legacy.push_str(&format!("{range}\n"));
    }
    legacy.push_str("6 262144 278527\n");

    let table = RangeTable::parse(&legacy)?;
    let counters = classify_trace(table, &load_test_trace()?)?;
    assert_eq!(counters.to_string(), EXPECTED_SUMMARY);
    Ok(())
}

#[test]
fn test_range_order_does_not_matter() -> Result<()> {
    let table = load_test_table()?;
    let mut ranges = table.ranges().to_vec();
    ranges.reverse();
    let reversed = RangeTable::new(ranges, table.journal());

    let trace = load_test_trace()?;
    assert_eq!(
        classify_trace(reversed, &trace)?,
        classify_trace(table, &trace)?
    );
    Ok(())
}

#[test]
fn test_without_journal() -> Result<()> {
    let mut table = load_test_table()?;
    table.set_journal(None);

    let counters = classify_trace(table, &load_test_trace()?)?;
    assert_eq!(counters.write(Bucket::DataJournal), 0);
    assert_eq!(counters.write(Bucket::DataAhead), 32 + 11);
    Ok(())
}

#[test]
fn test_incremental() -> Result<()> {
    let trace = load_test_trace()?;
    let split = trace.find("R 300000").context("trace has no R 300000")?;
    let (first, second) = trace.split_at(split);

    let mut classifier = Classifier::new(load_test_table()?);
    classifier.process_trace(first)?;
    assert_eq!(classifier.counters().read(Bucket::DataAhead), 0);
    classifier.process_trace(second)?;
    assert_eq!(classifier.into_counters().to_string(), EXPECTED_SUMMARY);
    Ok(())
}

#[test]
fn test_blank_line_in_trace() -> Result<()> {
    let trace = load_test_trace()?.replacen('\n', "\n\n", 1);
    let err = classify_trace(load_test_table()?, &trace).unwrap_err();
    assert_eq!(*err.as_malformed().unwrap(), Malformed::TraceLine(2));
    Ok(())
}
