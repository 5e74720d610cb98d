// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::{load_test_config, load_test_trace};
use anyhow::Result;
use blk_map::{Tally, count_trace};

#[test]
fn test_count_trace() -> Result<()> {
    let config = load_test_config()?;
    let count = count_trace(&load_test_trace()?, config.journal)?;
    assert_eq!(count.to_string(), "5 14 29 32 11 264\n4 8 4 1 3 2");
    Ok(())
}

#[test]
fn test_count_trace_without_journal() -> Result<()> {
    let count = count_trace(&load_test_trace()?, None)?;
    assert_eq!(count.journal_write, Tally::default());
    assert_eq!(
        count.data_write,
        Tally {
            blocks: 43,
            requests: 4
        }
    );
    Ok(())
}
