// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{bail, Context, Result};
use blk_map::{Geometry, JournalRange};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::{env, str};

/// Get the path of the root directory of the repo.
///
/// This assumes the currently-running executable is `<repo>/target/release/xtask`.
fn repo_root() -> Result<PathBuf> {
    let current_exe = env::current_exe()?;
    Ok(current_exe
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .context("xtask is not in expected location")?
        .to_owned())
}

/// Get the path of the `test_data` directory.
fn test_data_dir() -> Result<PathBuf> {
    Ok(repo_root()?.join("test_data"))
}

struct DiskParams {
    path: PathBuf,
    size_in_kilobytes: u64,
}

impl DiskParams {
    fn create(&self) -> Result<()> {
        // Create a sparse file of the requested size; mkfs only writes
        // the metadata blocks.
        File::create(&self.path)?.set_len(self.size_in_kilobytes * 1024)?;

        let geometry = Geometry::default();
        let status = Command::new("mkfs.ext4")
            .args(["-q", "-F", "-b", "4096"])
            // Pack bitmaps and inode tables for this many groups
            // together.
            .args(["-G", &geometry.group_size.to_string()])
            // 256-byte inodes, one per 16KiB, gives 8192 inodes and
            // 512 inode table blocks per group.
            .args(["-I", "256", "-i", "16384"])
            .arg(&self.path)
            .status()?;
        if !status.success() {
            bail!("mkfs.ext4 failed");
        }
        Ok(())
    }

    /// Run [dumpe2fs] on the disk and return the raw stdout.
    ///
    /// [dumpe2fs]: https://www.man7.org/linux/man-pages/man8/dumpe2fs.8.html
    fn run_dumpe2fs(&self) -> Result<String> {
        let output = Command::new("dumpe2fs").arg(&self.path).output()?;
        if !output.status.success() {
            bail!("dumpe2fs failed");
        }
        Ok(String::from_utf8(output.stdout)?)
    }

    /// Run the [debugfs] tool on the disk with the given `request` and
    /// return the raw stdout.
    ///
    /// [debugfs]: https://www.man7.org/linux/man-pages/man8/debugfs.8.html
    fn run_debugfs(&self, request: &str) -> Result<Vec<u8>> {
        let output = Command::new("debugfs")
            .args(["-R", request])
            .arg(&self.path)
            .output()?;
        if !output.status.success() {
            bail!("debugfs failed");
        }
        Ok(output.stdout)
    }

    /// Get the block range of the journal inode.
    ///
    /// mkfs allocates the journal as a single contiguous extent, shown
    /// by debugfs as `(0-16383):262144-278527`.
    fn journal_range(&self) -> Result<JournalRange> {
        let stdout = self.run_debugfs("stat <8>")?;
        let stdout = str::from_utf8(&stdout)?;
        let extent = stdout
            .lines()
            .skip_while(|line| !line.trim().starts_with("EXTENTS:"))
            .nth(1)
            .context("journal extents not found")?;
        let (_, blocks) = extent
            .trim()
            .split_once(':')
            .context("unexpected extent format")?;
        if blocks.contains(',') {
            bail!("journal is fragmented: {blocks}");
        }
        Ok(blocks.parse()?)
    }
}

fn write_config(path: &Path, journal: JournalRange) -> Result<()> {
    let geometry = Geometry::default();
    fs::write(
        path,
        format!(
            "[geometry]\ngroup_size = {}\ninode_table_size = {}\n\n[journal]\nstart = {}\nend = {}\n",
            geometry.group_size,
            geometry.inode_table_size,
            journal.start,
            journal.end
        ),
    )?;
    Ok(())
}

fn create_test_data() -> Result<()> {
    let dir = test_data_dir()?;
    if !dir.exists() {
        fs::create_dir(&dir)?;
    }

    // The image is only needed to produce the report, so it goes in a
    // temporary directory rather than being committed.
    let tmp_dir = tempfile::tempdir()?;
    let disk = DiskParams {
        path: tmp_dir.path().join("disk.bin"),
        // Twenty block groups of 128MiB, so there are two boundary
        // groups.
        size_in_kilobytes: 20 * 128 * 1024,
    };
    disk.create()?;

    fs::write(dir.join("dump.txt"), disk.run_dumpe2fs()?)?;
    write_config(&dir.join("blk_map.ini"), disk.journal_range()?)?;

    Ok(())
}

#[derive(Parser)]
struct Opt {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Create files for tests.
    ///
    /// This formats a scratch image and saves its `dumpe2fs` report and
    /// journal location under `test_data`. The output is committed, so
    /// developers working on the repo do not typically need to run this
    /// command. Note that regenerating it changes the block numbers the
    /// integration tests expect.
    CreateTestData,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    match &opt.action {
        Action::CreateTestData => create_test_data(),
    }
}
