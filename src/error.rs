// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Common error type for all `blk-map` operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum BlkMapError {
    /// An input file could not be read, or the output could not be
    /// written.
    Io(
        /// Underlying error.
        io::Error,
    ),

    /// The configuration could not be loaded or contains an invalid
    /// value.
    Config(ConfigError),

    /// A boundary group header in the layout dump is not followed by
    /// enough lines to hold its bitmap and inode table entries.
    TruncatedGroup {
        /// Block group number from the header.
        group: u64,

        /// Line number (1-based) of the group header.
        line: usize,
    },

    /// A layout dump, range table or trace is malformed in some way.
    Malformed(Malformed),
}

impl BlkMapError {
    /// If the error type is [`BlkMapError::Malformed`], get the
    /// underlying error.
    pub fn as_malformed(&self) -> Option<&Malformed> {
        if let Self::Malformed(err) = self {
            Some(err)
        } else {
            None
        }
    }

    /// If the error type is [`BlkMapError::Config`], get the underlying
    /// error.
    pub fn as_config(&self) -> Option<&ConfigError> {
        if let Self::Config(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl Display for BlkMapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            // The wrapped error is returned by `Error::source`.
            Self::Io(_) => write!(f, "io error"),
            Self::Config(_) => write!(f, "invalid config"),
            Self::TruncatedGroup { group, line } => write!(
                f,
                "group {group} at line {line} is truncated: bitmap and inode table lines are missing"
            ),
            Self::Malformed(_) => write!(f, "malformed input"),
        }
    }
}

impl Error for BlkMapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Malformed(err) => Some(err),
            Self::TruncatedGroup { .. } => None,
        }
    }
}

impl From<io::Error> for BlkMapError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<Malformed> for BlkMapError {
    fn from(err: Malformed) -> Self {
        Self::Malformed(err)
    }
}

impl From<ConfigError> for BlkMapError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Error type used in [`BlkMapError::Malformed`].
///
/// All line numbers are 1-based.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Malformed {
    /// A range table record has too few fields or a non-numeric
    /// address.
    TableRecord(
        /// Line number.
        usize,
    ),

    /// A range table record has a kind code outside `1..=5`.
    TableKind {
        /// Line number.
        line: usize,

        /// The unrecognized kind field.
        code: String,
    },

    /// A range table record ends before it starts.
    TableRange(
        /// Line number.
        usize,
    ),

    /// A legacy range table has no records, so there is no line to read
    /// the journal range from.
    EmptyTable,

    /// An extracted range runs past the largest block address.
    DumpRange(
        /// Line number in the dump.
        usize,
    ),

    /// A trace line does not have exactly three fields, or has a
    /// non-numeric address or count. This includes blank lines.
    TraceLine(
        /// Line number.
        usize,
    ),

    /// A trace entry needs a read/write direction but its op token does
    /// not start with `R` or `W`.
    TraceDirection {
        /// Line number.
        line: usize,

        /// The op token.
        op: String,
    },

    /// Adding a trace entry would overflow the counters.
    CountOverflow(
        /// Line number.
        usize,
    ),
}

impl Display for Malformed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableRecord(line) => {
                write!(f, "invalid range table record at line {line}")
            }
            Self::TableKind { line, code } => {
                write!(f, "unknown region kind {code:?} at line {line}")
            }
            Self::TableRange(line) => {
                write!(f, "range at line {line} ends before it starts")
            }
            Self::EmptyTable => write!(f, "range table is empty"),
            Self::DumpRange(line) => {
                write!(f, "range at dump line {line} is out of bounds")
            }
            Self::TraceLine(line) => {
                write!(f, "invalid trace entry at line {line}")
            }
            Self::TraceDirection { line, op } => write!(
                f,
                "op {op:?} at line {line} is neither a read nor a write"
            ),
            Self::CountOverflow(line) => {
                write!(f, "block count overflows at line {line}")
            }
        }
    }
}

impl Error for Malformed {}

/// Error type used in [`BlkMapError::Config`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be loaded or parsed as INI.
    Load(
        /// Message from the INI parser.
        String,
    ),

    /// A key holds a value that is not a valid unsigned integer.
    InvalidValue {
        /// `section.key` of the offending entry.
        key: String,

        /// Message from the INI parser.
        reason: String,
    },

    /// A geometry value is zero.
    Zero(
        /// `section.key` of the offending entry.
        &'static str,
    ),

    /// A journal range is not of the form `START-END`, or `START` is
    /// greater than `END`.
    JournalRange(
        /// The rejected text.
        String,
    ),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(msg) => write!(f, "failed to load config: {msg}"),
            Self::InvalidValue { key, reason } => {
                write!(f, "invalid value for {key}: {reason}")
            }
            Self::Zero(key) => write!(f, "{key} must be non-zero"),
            Self::JournalRange(text) => {
                write!(f, "invalid journal range {text:?}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_chain() {
        let err = BlkMapError::from(Malformed::TraceLine(3));
        assert_eq!(err.to_string(), "malformed input");
        assert_eq!(
            err.source().unwrap().to_string(),
            "invalid trace entry at line 3"
        );

        let err = BlkMapError::from(ConfigError::Zero("geometry.group_size"));
        assert_eq!(
            err.source().unwrap().to_string(),
            "geometry.group_size must be non-zero"
        );

        let err = BlkMapError::TruncatedGroup { group: 0, line: 2 };
        assert!(err.source().is_none());
    }
}
