// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{BlkMapError, Malformed};
use crate::region::{Bucket, RegionKind};
use crate::table::RangeTable;
use crate::trace::{Direction, OpQualifiers, TraceEntry, parse_trace};
use std::fmt::{self, Display, Formatter};
use tracing::{debug, info};

/// Read-side buckets, in summary order.
pub const READ_BUCKETS: [Bucket; 7] = [
    Bucket::Region(RegionKind::Superblock),
    Bucket::Region(RegionKind::GroupDescriptor),
    Bucket::Region(RegionKind::BlockBitmap),
    Bucket::Region(RegionKind::InodeBitmap),
    Bucket::Region(RegionKind::InodeTable),
    Bucket::DataEarly,
    Bucket::DataAhead,
];

/// Write-side buckets, in summary order.
pub const WRITE_BUCKETS: [Bucket; 8] = [
    Bucket::Region(RegionKind::Superblock),
    Bucket::Region(RegionKind::GroupDescriptor),
    Bucket::Region(RegionKind::BlockBitmap),
    Bucket::Region(RegionKind::InodeBitmap),
    Bucket::Region(RegionKind::InodeTable),
    Bucket::DataEarly,
    Bucket::DataAhead,
    Bucket::DataJournal,
];

/// Number of fields in a summary line.
pub const SUMMARY_FIELDS: usize = READ_BUCKETS.len() + WRITE_BUCKETS.len() + 1;

/// Index of `bucket` in the write counters. Read counters use the same
/// index, minus the write-only [`Bucket::DataJournal`].
const fn bucket_index(bucket: Bucket) -> usize {
    match bucket {
        Bucket::Region(kind) => kind.code() as usize - 1,
        Bucket::DataEarly => 5,
        Bucket::DataAhead => 6,
        Bucket::DataJournal => 7,
    }
}

/// Block counts per bucket.
///
/// The sum of all counters is tracked alongside them and never
/// overflows, so neither does any single counter.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    read: [u64; READ_BUCKETS.len()],
    write: [u64; WRITE_BUCKETS.len()],
    discard: u64,
    total: u64,
}

impl Counters {
    /// Blocks read in `bucket`. Always zero for
    /// [`Bucket::DataJournal`].
    pub fn read(&self, bucket: Bucket) -> u64 {
        self.read.get(bucket_index(bucket)).copied().unwrap_or(0)
    }

    pub fn write(&self, bucket: Bucket) -> u64 {
        self.write[bucket_index(bucket)]
    }

    pub fn discard(&self) -> u64 {
        self.discard
    }

    /// Sum of all counters.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Add `count` blocks to a bucket. Returns `None`, leaving the
    /// counters unchanged, if the total would overflow or there is no
    /// such counter for `direction`.
    fn add(
        &mut self,
        direction: Direction,
        bucket: Bucket,
        count: u64,
    ) -> Option<()> {
        let total = self.total.checked_add(count)?;
        let counter = match direction {
            Direction::Read => self.read.get_mut(bucket_index(bucket))?,
            Direction::Write => self.write.get_mut(bucket_index(bucket))?,
        };
        *counter += count;
        self.total = total;
        Some(())
    }

    fn add_discard(&mut self, count: u64) -> Option<()> {
        self.total = self.total.checked_add(count)?;
        self.discard += count;
        Some(())
    }

    /// All counters in summary order: reads, then writes, then
    /// discards.
    pub fn fields(&self) -> [u64; SUMMARY_FIELDS] {
        let mut fields = [0; SUMMARY_FIELDS];
        let values = self
            .read
            .iter()
            .chain(&self.write)
            .chain([&self.discard]);
        for (field, value) in fields.iter_mut().zip(values) {
            *field = *value;
        }
        fields
    }
}

impl Display for Counters {
    /// Format as one line of tab-separated counts.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, value) in self.fields().iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

/// Tallies trace entries against a range table.
pub struct Classifier {
    table: RangeTable,
    counters: Counters,
}

impl Classifier {
    /// Create a classifier. The table's ranges are sorted by start
    /// address.
    pub fn new(mut table: RangeTable) -> Self {
        table.sort_by_start();
        Self {
            table,
            counters: Counters::default(),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn into_counters(self) -> Counters {
        self.counters
    }

    /// Add one entry to the counters.
    ///
    /// Merged or random-access ops are counted under the region
    /// containing their address. Discards are only counted in total.
    /// Anything else is a plain read or write, which is counted as
    /// journal data if it's a write inside the journal and as data
    /// otherwise.
    pub fn process(
        &mut self,
        line_num: usize,
        entry: &TraceEntry,
    ) -> Result<(), Malformed> {
        let qualifiers = entry.qualifiers();
        let overflow = || Malformed::CountOverflow(line_num);
        let direction = || {
            entry.direction().ok_or_else(|| Malformed::TraceDirection {
                line: line_num,
                op: entry.op.clone(),
            })
        };

        if qualifiers
            .intersects(OpQualifiers::MERGED | OpQualifiers::RANDOM_ACCESS)
        {
            let bucket = self.table.classify(entry.lba);
            self.counters
                .add(direction()?, bucket, entry.count)
                .ok_or_else(overflow)?;
        } else if qualifiers.contains(OpQualifiers::DISCARD) {
            self.counters.add_discard(entry.count).ok_or_else(overflow)?;
        } else {
            let direction = direction()?;
            let in_journal = self
                .table
                .journal()
                .is_some_and(|journal| journal.contains(entry.lba));
            let bucket = if direction == Direction::Write && in_journal {
                Bucket::DataJournal
            } else {
                Bucket::DataAhead
            };
            self.counters
                .add(direction, bucket, entry.count)
                .ok_or_else(overflow)?;
        }
        Ok(())
    }

    /// Process every entry of a trace.
    pub fn process_trace(&mut self, text: &str) -> Result<(), Malformed> {
        let mut entries = 0;
        for item in parse_trace(text) {
            let (line_num, entry) = item?;
            self.process(line_num, &entry)?;
            entries += 1;
        }
        debug!(counters = ?self.counters, "final counters");
        info!(entries, blocks = self.counters.total(), "classified trace");
        Ok(())
    }
}

/// Classify a whole trace against `table`.
pub fn classify_trace(
    table: RangeTable,
    trace: &str,
) -> Result<Counters, BlkMapError> {
    let mut classifier = Classifier::new(table);
    classifier.process_trace(trace)?;
    Ok(classifier.into_counters())
}
