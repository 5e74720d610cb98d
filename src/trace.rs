// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Malformed;
use crate::region::Lba;
use bitflags::bitflags;

/// Read or write, from the first character of an op token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Read,
    Write,
}

bitflags! {
    /// Qualifiers found anywhere in an op token.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct OpQualifiers: u8 {
        /// `M` in the token.
        const MERGED = 0x1;

        /// `RA` in the token.
        const RANDOM_ACCESS = 0x2;

        /// `D` in the token.
        const DISCARD = 0x4;
    }
}

/// One line of a block access trace: `<op> <lba> <count>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceEntry {
    /// Op token, e.g. `R`, `WS`, `WM`, `RA`, `D`.
    pub op: String,

    /// First block accessed.
    pub lba: Lba,

    /// Number of blocks accessed.
    pub count: u64,
}

impl TraceEntry {
    /// Parse one trace line. `line_num` is 1-based and only used for
    /// errors.
    pub fn parse(line: &str, line_num: usize) -> Result<Self, Malformed> {
        let err = || Malformed::TraceLine(line_num);

        let mut fields = line.split_whitespace();
        let (Some(op), Some(lba), Some(count), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(err());
        };

        Ok(Self {
            op: op.to_owned(),
            lba: lba.parse().map_err(|_| err())?,
            count: count.parse().map_err(|_| err())?,
        })
    }

    pub fn qualifiers(&self) -> OpQualifiers {
        let mut q = OpQualifiers::empty();
        q.set(OpQualifiers::MERGED, self.op.contains('M'));
        q.set(OpQualifiers::RANDOM_ACCESS, self.op.contains("RA"));
        q.set(OpQualifiers::DISCARD, self.op.contains('D'));
        q
    }

    /// Direction from the first character of the op token, if it is
    /// `R` or `W`.
    pub fn direction(&self) -> Option<Direction> {
        match self.op.chars().next()? {
            'R' => Some(Direction::Read),
            'W' => Some(Direction::Write),
            _ => None,
        }
    }
}

/// Iterate over the entries of a trace, along with their 1-based line
/// numbers.
///
/// Every line must hold an entry; a blank line is a
/// [`Malformed::TraceLine`] error like any other short line.
pub fn parse_trace(
    text: &str,
) -> impl Iterator<Item = Result<(usize, TraceEntry), Malformed>> + '_ {
    text.lines().enumerate().map(|(index, line)| {
        let line_num = index + 1;
        TraceEntry::parse(line, line_num).map(|entry| (line_num, entry))
    })
}
