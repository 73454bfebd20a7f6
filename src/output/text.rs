//! Human-readable report of duplicate groups.
//!
//! ```text
//! Group 1: 2 files, 1.0 MiB each
//!   fingerprint 1048576d41d8cd98f00b204e9800998ecf8427e
//!   /data/a.bin
//!   /data/copy of a.bin
//!
//! 1 duplicate groups, 1 duplicate files, 1.0 MiB reclaimable
//! 120 files indexed (3 skipped) in 0.42s
//! ```

use std::io::{self, Write};

use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Text report over a finished search.
#[derive(Debug)]
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a report for `groups`.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], summary: &'a ScanSummary) -> Self {
        Self { groups, summary }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.groups.is_empty() {
            writeln!(writer, "No duplicates found.")?;
        }

        for (i, group) in self.groups.iter().enumerate() {
            writeln!(
                writer,
                "Group {}: {} files, {} each",
                i + 1,
                group.len(),
                bytesize::ByteSize::b(group.size())
            )?;
            if let Some(fingerprint) = &group.fingerprint {
                writeln!(writer, "  fingerprint {fingerprint}")?;
            }
            for path in group.paths() {
                writeln!(writer, "  {}", path.display())?;
            }
            writeln!(writer)?;
        }

        writeln!(
            writer,
            "{} duplicate groups, {} duplicate files, {} reclaimable",
            self.summary.duplicate_groups,
            self.summary.duplicate_files,
            self.summary.reclaimable_display()
        )?;
        writeln!(
            writer,
            "{} files indexed ({} skipped) in {:.2}s",
            self.summary.indexed_files,
            self.summary.skipped_files,
            self.summary.scan_duration.as_secs_f64()
        )?;
        Ok(())
    }
}
