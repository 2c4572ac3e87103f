//! Progress snapshots from the backend and their throttled display form.

use crate::format::{format_eta, format_speed};

/// Stage reported by the backend for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// Bytes are still arriving.
    Downloading,
    /// The transfer of one file finished; post-processing may follow.
    Finished,
}

/// One progress report from the backend. Snapshots are independent.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub status: ProgressStatus,
    pub downloaded_bytes: u64,
    /// Exact or estimated total, when known.
    pub total_bytes: Option<u64>,
    /// Bytes per second.
    pub speed: Option<f64>,
    /// Seconds remaining.
    pub eta: Option<u64>,
}

impl ProgressSnapshot {
    /// A `downloading` snapshot.
    #[must_use]
    pub const fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            downloaded_bytes,
            total_bytes,
            speed: None,
            eta: None,
        }
    }

    /// A `finished` snapshot.
    #[must_use]
    pub const fn finished(total_bytes: u64) -> Self {
        Self {
            status: ProgressStatus::Finished,
            downloaded_bytes: total_bytes,
            total_bytes: Some(total_bytes),
            speed: None,
            eta: None,
        }
    }

    /// Sets the speed and ETA.
    #[must_use]
    pub const fn with_rate(mut self, speed: Option<f64>, eta: Option<u64>) -> Self {
        self.speed = speed;
        self.eta = eta;
        self
    }

    /// Total bytes, never less than 1 so it is always safe to divide by.
    #[must_use]
    pub fn total_or_one(&self) -> u64 {
        self.total_bytes.unwrap_or(1).max(1)
    }

    /// Completed fraction, clamped to `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        (self.downloaded_bytes as f64 / self.total_or_one() as f64).clamp(0.0, 1.0)
    }
}

/// Display-ready progress, emitted to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub fraction: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    /// Formatted speed, e.g. `"1.50 MB/s"` or `"N/A"`.
    pub speed: String,
    /// Formatted ETA, e.g. `"12s"` or `"?"`.
    pub eta: String,
}

impl ProgressUpdate {
    /// `"12.34 MB / 56.78 MB | 21.7%"`, using decimal megabytes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> String {
        format!(
            "{:.2} MB / {:.2} MB | {:.1}%",
            self.downloaded_bytes as f64 / 1e6,
            self.total_bytes as f64 / 1e6,
            self.fraction * 100.0
        )
    }

    /// `"Speed: 1.50 MB/s | ETA: 12s"`.
    #[must_use]
    pub fn rate_line(&self) -> String {
        format!("Speed: {} | ETA: {}", self.speed, self.eta)
    }
}

/// Suppresses updates that would not visibly change the display.
///
/// An update is emitted when the fraction moved by more than the threshold
/// or when the formatted speed or ETA text differs from the last one sent.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    threshold: f64,
    last: Option<(f64, String, String)>,
}

impl ProgressThrottle {
    /// Creates a throttle with the given fraction threshold.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    /// Returns an update for `snapshot` unless it is indistinguishable from
    /// the previous one.
    pub fn observe(&mut self, snapshot: &ProgressSnapshot) -> Option<ProgressUpdate> {
        let fraction = snapshot.fraction();
        let speed = format_speed(snapshot.speed);
        let eta = format_eta(snapshot.eta);

        if let Some((last_fraction, last_speed, last_eta)) = &self.last
            && (fraction - last_fraction).abs() <= self.threshold
            && *last_speed == speed
            && *last_eta == eta
        {
            return None;
        }

        self.last = Some((fraction, speed.clone(), eta.clone()));
        Some(ProgressUpdate {
            fraction,
            downloaded_bytes: snapshot.downloaded_bytes,
            total_bytes: snapshot.total_or_one(),
            speed,
            eta,
        })
    }

    /// Forgets the last emitted values.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped() {
        assert!((ProgressSnapshot::downloading(50, Some(100)).fraction() - 0.5).abs() < 1e-9);
        assert!((ProgressSnapshot::downloading(150, Some(100)).fraction() - 1.0).abs() < 1e-9);
        assert!(ProgressSnapshot::downloading(0, Some(100)).fraction().abs() < 1e-9);
    }

    #[test]
    fn unknown_total_counts_as_one() {
        let snapshot = ProgressSnapshot::downloading(10, None);
        assert_eq!(snapshot.total_or_one(), 1);
        assert!((snapshot.fraction() - 1.0).abs() < 1e-9);
        assert_eq!(ProgressSnapshot::downloading(0, Some(0)).total_or_one(), 1);
    }

    #[test]
    fn first_snapshot_is_always_emitted() {
        let mut throttle = ProgressThrottle::new(0.001);
        let update = throttle
            .observe(&ProgressSnapshot::downloading(0, Some(1_000_000)))
            .unwrap();
        assert_eq!(update.speed, "N/A");
        assert_eq!(update.eta, "?");
    }

    #[test]
    fn small_moves_are_suppressed() {
        let mut throttle = ProgressThrottle::new(0.001);
        assert!(throttle.observe(&ProgressSnapshot::downloading(0, Some(1_000_000))).is_some());
        assert!(throttle.observe(&ProgressSnapshot::downloading(500, Some(1_000_000))).is_none());
        assert!(throttle.observe(&ProgressSnapshot::downloading(1_000, Some(1_000_000))).is_none());
        assert!(throttle.observe(&ProgressSnapshot::downloading(1_001, Some(1_000_000))).is_some());
    }

    #[test]
    fn rate_changes_are_emitted() {
        let mut throttle = ProgressThrottle::new(0.001);
        let base = ProgressSnapshot::downloading(100, Some(1_000_000));
        assert!(throttle.observe(&base.clone().with_rate(Some(1024.0), Some(10))).is_some());
        assert!(throttle.observe(&base.clone().with_rate(Some(1024.0), Some(10))).is_none());
        assert!(throttle.observe(&base.clone().with_rate(Some(1024.0), Some(9))).is_some());
        assert!(throttle.observe(&base.with_rate(Some(4096.0), Some(9))).is_some());
    }

    #[test]
    fn reset_forgets_history() {
        let mut throttle = ProgressThrottle::new(0.001);
        let snapshot = ProgressSnapshot::downloading(5, Some(10));
        assert!(throttle.observe(&snapshot).is_some());
        assert!(throttle.observe(&snapshot).is_none());
        throttle.reset();
        assert!(throttle.observe(&snapshot).is_some());
    }

    #[test]
    fn update_display_strings() {
        let update = ProgressUpdate {
            fraction: 0.25,
            downloaded_bytes: 2_500_000,
            total_bytes: 10_000_000,
            speed: "1.00 MB/s".to_string(),
            eta: "8s".to_string(),
        };
        assert_eq!(update.summary(), "2.50 MB / 10.00 MB | 25.0%");
        assert_eq!(update.rate_line(), "Speed: 1.00 MB/s | ETA: 8s");
    }
}
