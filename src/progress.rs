//! Progress reporting for balancer runs
//!
//! Provides a spinner that doubles as an outcome collector, plus header and
//! summary output for the CLI.

use crate::config::BalancePlan;
use crate::scheduler::{Outcome, OutcomeCollector, RecordingCollector};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Spinner showing completed operations as they arrive
///
/// Forwards every outcome to a [`RecordingCollector`] so the final summary
/// can be printed from it.
pub struct ProgressReporter {
    bar: ProgressBar,
    done: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
    inner: Arc<RecordingCollector>,
}

impl ProgressReporter {
    /// Create a reporter; `visible` false keeps the spinner hidden
    pub fn new(inner: Arc<RecordingCollector>, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        if visible {
            bar.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            bar,
            done: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            inner,
        }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    fn refresh(&self) {
        let msg = format!(
            "Balanced: {} | Failed: {} | Size: {}",
            format_number(self.done.load(Ordering::Relaxed)),
            format_number(self.failed.load(Ordering::Relaxed)),
            format_size(self.bytes.load(Ordering::Relaxed), BINARY),
        );
        self.bar.set_message(msg);
    }
}

impl OutcomeCollector for ProgressReporter {
    fn record(&self, outcome: Outcome) {
        match &outcome.result {
            Ok(result) => {
                self.done.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(result.size, Ordering::Relaxed);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.refresh();
        self.inner.record(outcome);
    }
}

/// Totals for the end-of-run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files with a recorded outcome
    pub files: u64,

    /// Successful operations that changed replication
    pub changed: u64,

    /// Successful operations that left the file as it was
    pub unchanged: u64,

    /// Failed operations
    pub failed: u64,

    /// Bytes covered by successful operations
    pub bytes: u64,
}

impl RunSummary {
    /// Tally a collector's outcomes
    pub fn from_collector(collector: &RecordingCollector) -> Self {
        let mut summary = Self::default();
        for outcome in collector.outcomes() {
            summary.files += 1;
            match outcome.result {
                Ok(result) if result.changed() => {
                    summary.changed += 1;
                    summary.bytes += result.size;
                }
                Ok(result) => {
                    summary.unchanged += 1;
                    summary.bytes += result.size;
                }
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run
pub fn print_summary(summary: &RunSummary, duration: Duration) {
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        summary.files as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Balance Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Files:").bold(), format_number(summary.files));
    println!("  {} {}", style("Changed:").bold(), format_number(summary.changed));
    println!("  {} {}", style("Unchanged:").bold(), format_number(summary.unchanged));
    println!("  {} {}", style("Total Size:").bold(), format_size(summary.bytes, BINARY));
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if summary.failed > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(summary.failed)
        );
    }
    println!();
}

/// Print a header at the start of the run
pub fn print_header(plan: &BalancePlan) {
    println!();
    println!(
        "{} {}",
        style("hadaps-balancer").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Namespace:").bold(), plan.namespace);
    for pattern in &plan.patterns {
        println!("  {} {}", style("Pattern:").bold(), pattern);
    }
    for generation in &plan.generations {
        println!(
            "  {} {} ({} hosts)",
            style("Generation:").bold(),
            generation.name,
            generation.hosts.len()
        );
    }
    println!("  {} {}", style("Workers:").bold(), plan.config.worker_count);
    println!();
}
