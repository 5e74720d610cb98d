// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Metadata/data/journal tally that does not need a range table.
//!
//! Ops are sorted only by their token: the first of `R`, `W`, `D` or
//! `N` gives the direction and an `M` anywhere marks metadata.

use crate::error::Malformed;
use crate::region::JournalRange;
use crate::trace::{TraceEntry, parse_trace};
use std::fmt::{self, Display, Formatter};
use tracing::info;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CountOp {
    Read,
    Write,
    Discard,
    None,
}

impl CountOp {
    fn from_token(op: &str) -> Self {
        for c in op.chars() {
            match c {
                'R' => return Self::Read,
                'W' => return Self::Write,
                'D' => return Self::Discard,
                'N' => return Self::None,
                _ => {}
            }
        }
        Self::None
    }
}

/// Blocks and number of requests for one category.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    pub blocks: u64,
    pub requests: u64,
}

impl Tally {
    fn add(&mut self, blocks: u64) -> Option<()> {
        let blocks = self.blocks.checked_add(blocks)?;
        let requests = self.requests.checked_add(1)?;
        *self = Self { blocks, requests };
        Some(())
    }
}

/// Tallies per category.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IoCount {
    pub metadata_read: Tally,
    pub metadata_write: Tally,
    pub data_read: Tally,
    pub data_write: Tally,

    /// Writes inside the journal. These are not included in
    /// `metadata_write` or `data_write`.
    pub journal_write: Tally,

    pub discard: Tally,
}

impl IoCount {
    /// Add one entry. Entries with no direction are ignored.
    /// `line_num` is only used for errors.
    pub fn process(
        &mut self,
        line_num: usize,
        entry: &TraceEntry,
        journal: Option<JournalRange>,
    ) -> Result<(), Malformed> {
        let metadata = entry.op.contains('M');
        let tally = match CountOp::from_token(&entry.op) {
            CountOp::Read if metadata => &mut self.metadata_read,
            CountOp::Read => &mut self.data_read,
            CountOp::Write
                if journal.is_some_and(|j| j.contains(entry.lba)) =>
            {
                &mut self.journal_write
            }
            CountOp::Write if metadata => &mut self.metadata_write,
            CountOp::Write => &mut self.data_write,
            CountOp::Discard => &mut self.discard,
            CountOp::None => return Ok(()),
        };
        tally
            .add(entry.count)
            .ok_or(Malformed::CountOverflow(line_num))
    }

    fn tallies(&self) -> [Tally; 6] {
        [
            self.metadata_read,
            self.metadata_write,
            self.data_read,
            self.data_write,
            self.journal_write,
            self.discard,
        ]
    }
}

impl Display for IoCount {
    /// Format as two lines: block counts, then request counts, each in
    /// the order metadata read, metadata write, data read, data write,
    /// journal write, discard.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tallies = self.tallies();
        let blocks: Vec<String> =
            tallies.iter().map(|t| t.blocks.to_string()).collect();
        let requests: Vec<String> =
            tallies.iter().map(|t| t.requests.to_string()).collect();
        writeln!(f, "{}", blocks.join(" "))?;
        write!(f, "{}", requests.join(" "))
    }
}

/// Tally a whole trace.
pub fn count_trace(
    trace: &str,
    journal: Option<JournalRange>,
) -> Result<IoCount, Malformed> {
    let mut count = IoCount::default();
    for item in parse_trace(trace) {
        let (line_num, entry) = item?;
        count.process(line_num, &entry, journal)?;
    }
    info!(
        requests = count.tallies().iter().map(|t| t.requests).sum::<u64>(),
        "counted trace"
    );
    Ok(count)
}
