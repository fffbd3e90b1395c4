use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for the fetch, compute and write phases
#[derive(Debug)]
pub struct PhaseProgress {
    pb: ProgressBar,
    quiet: bool,
}

impl PhaseProgress {
    pub fn start(quiet: bool) -> Self {
        if !quiet {
            eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        }
        let pb = create_spinner(
            bright_yellow("Phase 1/3: Fetching milestones").to_string(),
            quiet,
        );
        Self { pb, quiet }
    }

    pub fn finish_fetch_start_compute(self, milestone_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Fetched {milestone_count} milestones ✓")).to_string(),
        );
        let pb = create_spinner(
            bright_yellow("Phase 2/3: Computing cycle times").to_string(),
            self.quiet,
        );
        Self { pb, ..self }
    }

    pub fn finish_compute_start_write(self, issue_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 2/3: Computed metrics for {issue_count} issues ✓"))
                .to_string(),
        );
        let pb = create_spinner(
            bright_yellow("Phase 3/3: Writing report").to_string(),
            self.quiet,
        );
        Self { pb, ..self }
    }

    pub fn finish_write(self, path: &Path) {
        self.pb.finish_with_message(
            bright_green(format!("Phase 3/3: Report written to {} ✓", path.display())).to_string(),
        );
        if !self.quiet {
            eprintln!();
        }
    }

    /// Clears the spinner without a success message.
    pub fn abandon(self) {
        self.pb.finish_and_clear();
    }
}

fn create_spinner(message: String, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_draw_target(ProgressDrawTarget::stderr());
    }
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    if !quiet {
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
    }
    pb
}
