//! Categorized result files, created on demand.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use voucher_core::{OutcomeClass, ResultEvent, ResultWriter};

/// Appends one newline-delimited record per event to the file for its
/// outcome class. Valid codes are written with the redeem URL prefix
/// so the output is directly usable.
pub struct FileResultWriter {
    results_dir: PathBuf,
    redeem_prefix: String,
}

impl FileResultWriter {
    pub fn new(results_dir: impl Into<PathBuf>, redeem_prefix: impl Into<String>) -> Self {
        Self {
            results_dir: results_dir.into(),
            redeem_prefix: redeem_prefix.into(),
        }
    }

    fn file_name(outcome: OutcomeClass) -> &'static str {
        match outcome {
            OutcomeClass::Acquired => "codes.txt",
            OutcomeClass::Monthly => "monthly.txt",
            OutcomeClass::Quarterly => "quarterly.txt",
            OutcomeClass::Yearly => "yearly.txt",
            OutcomeClass::Invalid => "invalid.txt",
        }
    }

    fn append_line(&self, path: &Path, line: &str) -> Result<()> {
        std::fs::create_dir_all(&self.results_dir)
            .with_context(|| format!("Failed to create {}", self.results_dir.display()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        writeln!(file, "{}", line.trim()).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[async_trait]
impl ResultWriter for FileResultWriter {
    async fn write(&self, event: &ResultEvent) -> Result<()> {
        let path = self.results_dir.join(Self::file_name(event.outcome));
        // Invalid codes are recorded bare; everything else redeemable.
        let line = match event.outcome {
            OutcomeClass::Invalid => event.code.clone(),
            _ => format!("{}{}", self.redeem_prefix, event.code),
        };
        self.append_line(&path, &line)
    }
}

/// Reads a newline-delimited target file, trimming blanks, `#`
/// comments, and the redeem URL prefix when present.
pub fn read_targets(path: &str, redeem_prefix: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target file {}", path))?;

    let codes = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.strip_prefix(redeem_prefix)
                .filter(|_| !redeem_prefix.is_empty())
                .unwrap_or(line)
                .to_string()
        })
        .collect();

    Ok(codes)
}
