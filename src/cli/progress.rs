//! Progress bar and summary reporting for CLI downloads.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{DownloadOutcome, DownloadProgress, DownloadRequest, MediaInfo, ProgressUpdate, elide};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Resolution of the bar; progress fractions are mapped onto this many steps.
const BAR_STEPS: u64 = 1000;

/// Creates the progress bar for a single download.
pub fn make_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(BAR_STEPS);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {msg}")
            .expect("progress template is valid")
            .progress_chars("━━╌"),
    );
    bar
}

/// Drives an `indicatif` bar from download callbacks.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub const fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn position(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_STEPS as f64).round() as u64
}

impl DownloadProgress for CliProgress {
    fn on_start(&self, request: &DownloadRequest) {
        self.bar
            .println(format!("Saving to {}", request.output_dir().display()));
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        self.bar.set_position(position(update.fraction));
        self.bar
            .set_message(format!("{} | {}", update.summary(), update.rate_line()));
    }

    fn on_processing(&self) {
        self.bar.set_position(BAR_STEPS);
        self.bar.set_message("Processing...");
    }

    fn on_fallback(&self, proxy: Option<&str>, first_error: &str) {
        self.bar.println(format!("Download failed: {first_error}"));
        self.bar.set_position(0);
        self.bar.set_message(format!(
            "Retrying via {}...",
            proxy.unwrap_or("a direct connection")
        ));
    }

    fn on_finished(&self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Completed { .. } => self.bar.finish_and_clear(),
            _ => self.bar.abandon(),
        }
    }
}

/// Prints what is about to be downloaded.
#[allow(clippy::cast_precision_loss)]
pub fn print_media(info: &MediaInfo, selection: &str) {
    println!("\n{SEPARATOR}");
    println!("  {}", style(elide(&info.title, 60)).bold());
    println!("  {}", info.webpage_url);
    if let Some(size) = info.approx_filesize {
        println!("  ~{} ({selection})", crate::format_bytes(size as f64));
    } else {
        println!("  {selection}");
    }
    println!("{SEPARATOR}\n");
}

/// Prints how the download ended.
pub fn print_outcome(outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Completed { via_fallback: false } => {
            println!("{}", style("Download completed!").green());
        }
        DownloadOutcome::Completed { via_fallback: true } => {
            println!("{}", style("Download completed (via proxy)!").green());
        }
        DownloadOutcome::Cancelled => println!("{}", style("Download cancelled").yellow()),
        DownloadOutcome::CredentialProblem(message) => {
            eprintln!("{} {message}", style("Cookies need refreshing:").red());
        }
        DownloadOutcome::Failed(message) => {
            eprintln!("{} {message}", style("Download failed:").red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_maps_onto_bar() {
        assert_eq!(position(0.0), 0);
        assert_eq!(position(0.5), 500);
        assert_eq!(position(1.0), BAR_STEPS);
        assert_eq!(position(1.7), BAR_STEPS);
        assert_eq!(position(-0.2), 0);
    }

    #[test]
    fn callbacks_move_the_bar() {
        let bar = ProgressBar::hidden();
        let sink = CliProgress::new(bar.clone());
        sink.on_progress(&ProgressUpdate {
            fraction: 0.25,
            downloaded_bytes: 250,
            total_bytes: 1000,
            speed: "1.00 KB/s".to_string(),
            eta: "1s".to_string(),
        });
        assert_eq!(bar.position(), 250);
        assert!(bar.message().contains("ETA: 1s"));

        sink.on_processing();
        assert_eq!(bar.position(), BAR_STEPS);
        assert_eq!(bar.message(), "Processing...");

        sink.on_fallback(Some("http://10.0.0.1:8080"), "boom");
        assert_eq!(bar.position(), 0);
        assert!(bar.message().contains("10.0.0.1:8080"));

        sink.on_finished(&DownloadOutcome::Completed { via_fallback: true });
        assert!(bar.is_finished());
    }
}
