// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod classify;
mod count;
mod extract;

use anyhow::{Context, Result};
use blk_map::{Config, RangeTable, extract_ranges};
use std::fs;

mod test_util {
    include!("../../src/test_util.rs");
}

fn read_test_data(name: &str) -> Result<String> {
    let path = test_util::test_data_path(name);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Load the config written by `cargo xtask create-test-data`.
fn load_test_config() -> Result<Config> {
    Ok(Config::load(&test_util::test_data_path("blk_map.ini"))?)
}

/// Build the range table for `test_data/dump.txt`, including the
/// journal from the test config.
fn load_test_table() -> Result<RangeTable> {
    let config = load_test_config()?;
    let ranges = extract_ranges(&read_test_data("dump.txt")?, config.geometry)?;
    Ok(RangeTable::new(ranges, config.journal))
}

fn load_test_trace() -> Result<String> {
    read_test_data("trace.txt")
}
