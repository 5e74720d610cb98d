// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use blk_map::{
    Bucket, Config, Counters, JournalRange, RangeTable, READ_BUCKETS,
    WRITE_BUCKETS, classify_trace, count_trace, extract_ranges,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Classify block I/O traces by ext4 metadata region.
#[derive(Parser)]
struct Opt {
    /// Log debug output to stderr. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Build a range table from a dumpe2fs report.
    Extract(ExtractOpt),

    /// Tally a trace per metadata region.
    Classify(ClassifyOpt),

    /// Tally a trace into metadata, data and journal I/O without a
    /// range table.
    Count(CountOpt),
}

#[derive(Args)]
struct ConfigArgs {
    /// INI file with `[geometry]` and `[journal]` sections.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Journal block range, overrides the config file.
    #[arg(long, value_name = "START-END")]
    journal: Option<JournalRange>,
}

#[derive(Args)]
struct ExtractOpt {
    /// Output of `dumpe2fs`.
    #[arg(long, default_value = "dump.txt")]
    dump: PathBuf,

    /// Range table to write. Existing content is replaced.
    #[arg(short, long, default_value = "blk_map.txt")]
    output: PathBuf,

    /// Block groups per flex group.
    #[arg(long)]
    group_size: Option<u64>,

    /// Inode table blocks per group.
    #[arg(long)]
    inode_table_size: Option<u64>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct ClassifyOpt {
    /// Trace with one `<op> <lba> <count>` entry per line.
    trace: PathBuf,

    /// Range table written by `extract`.
    #[arg(short, long, default_value = "blk_map.txt")]
    map: PathBuf,

    /// Journal block range, overrides the range table.
    #[arg(long, value_name = "START-END")]
    journal: Option<JournalRange>,

    #[arg(short, long, value_enum, default_value_t = Format::Tsv)]
    format: Format,
}

#[derive(Args)]
struct CountOpt {
    /// Trace with one `<op> <lba> <count>` entry per line.
    trace: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// One line of tab-separated counts.
    Tsv,

    /// Labelled table.
    Table,
}

fn load_config(args: &ConfigArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| {
            format!("failed to load config {}", path.display())
        })?,
        None => Config::default(),
    };
    if args.journal.is_some() {
        config.journal = args.journal;
    }
    Ok(config)
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
}

fn extract(opt: &ExtractOpt) -> Result<RangeTable> {
    let mut config = load_config(&opt.config)?;
    config.override_geometry(opt.group_size, opt.inode_table_size)?;

    let dump = read_input(&opt.dump)?;
    let ranges = extract_ranges(&dump, config.geometry)
        .with_context(|| format!("failed to parse {}", opt.dump.display()))?;
    let table = RangeTable::new(ranges, config.journal);
    table
        .save(&opt.output)
        .with_context(|| format!("failed to write {}", opt.output.display()))?;

    info!(
        ranges = table.ranges().len(),
        output = %opt.output.display(),
        "wrote range table"
    );
    Ok(table)
}

fn classify(opt: &ClassifyOpt) -> Result<Counters> {
    let mut table = RangeTable::load(&opt.map)
        .with_context(|| format!("failed to load {}", opt.map.display()))?;
    if opt.journal.is_some() {
        table.set_journal(opt.journal);
    }

    let trace = read_input(&opt.trace)?;
    let counters = classify_trace(table, &trace)
        .with_context(|| format!("failed to classify {}", opt.trace.display()))?;
    Ok(counters)
}

fn counters_to_table(counters: &Counters) -> String {
    let mut builder = Builder::new();

    let mut header = vec![String::new()];
    header.extend(WRITE_BUCKETS.iter().map(Bucket::to_string));
    builder.push_record(header);

    let mut reads = vec!["read".to_string()];
    reads.extend(READ_BUCKETS.iter().map(|b| counters.read(*b).to_string()));
    reads.push("-".to_string());
    builder.push_record(reads);

    let mut writes = vec!["write".to_string()];
    writes.extend(WRITE_BUCKETS.iter().map(|b| counters.write(*b).to_string()));
    builder.push_record(writes);

    let mut discards = vec!["discard".to_string(), counters.discard().to_string()];
    discards.resize(WRITE_BUCKETS.len() + 1, String::new());
    builder.push_record(discards);

    builder
        .build()
        .modify(Columns::new(1..), Alignment::right())
        .with(Style::empty())
        .to_string()
}

fn run(opt: &Opt) -> Result<()> {
    match &opt.action {
        Action::Extract(opt) => {
            extract(opt)?;
        }
        Action::Classify(opt) => {
            let counters = classify(opt)?;
            match opt.format {
                Format::Tsv => println!("{counters}"),
                Format::Table => println!("{}", counters_to_table(&counters)),
            }
        }
        Action::Count(opt) => {
            let config = load_config(&opt.config)?;
            let trace = read_input(&opt.trace)?;
            let count = count_trace(&trace, config.journal).with_context(
                || format!("failed to count {}", opt.trace.display()),
            )?;
            println!("{count}");
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let opt = Opt::parse();
    init_logging(opt.verbose);

    if let Err(err) = run(&opt) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
