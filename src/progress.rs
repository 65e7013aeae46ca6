//! Human-readable sizes, transfer rates and the upload status line.

use std::cell::Cell;
use std::io::Write;
use std::time::{Duration, Instant};

/// Units used by [`format_size`], in decimal (1000) steps.
const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Format a byte count as a scaled size such as `"1.5 MB"`.
///
/// With `force_bytes` the raw count is printed (`"1500000 B"`). Otherwise the
/// value is divided by 1000 while it is strictly greater than 1000, so
/// exactly 1000 bytes prints as `"1000.0 B"`. Scaling stops at PB.
pub fn format_size(bytes: u64, force_bytes: bool) -> String {
    if force_bytes {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}

/// Format an integer with comma-separated groups of three digits.
///
/// ```
/// use gdrive_transfer::progress::comma;
///
/// assert_eq!(comma(1234567), "1,234,567");
/// assert_eq!(comma(-42), "-42");
/// ```
pub fn comma(value: impl Into<i128>) -> String {
    let value = value.into();
    let sign = if value < 0 { "-" } else { "" };
    let mut rest = value.unsigned_abs();

    let mut groups = Vec::new();
    while rest > 999 {
        groups.push(format!("{:03}", rest % 1000));
        rest /= 1000;
    }
    groups.push(rest.to_string());
    groups.reverse();

    format!("{}{}", sign, groups.join(","))
}

/// Average transfer rate since a fixed starting point.
#[derive(Debug, Clone, Copy)]
pub struct TransferRate {
    started: Instant,
}

impl TransferRate {
    /// Start measuring now.
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self { started }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Rate for `bytes` transferred so far, e.g. `"2.5 MB/s"`.
    pub fn rate(&self, bytes: u64) -> String {
        rate_over(bytes, self.elapsed())
    }
}

/// Rate for `bytes` moved in `elapsed`, truncated to whole seconds.
///
/// Under one second there is nothing meaningful to divide by, so the byte
/// count itself is reported as the rate.
pub fn rate_over(bytes: u64, elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    if seconds < 1 {
        return format!("{}/s", format_size(bytes, false));
    }
    format!("{}/s", format_size(bytes / seconds, false))
}

/// `"Uploaded at <rate>, <current>/<total>"` for the in-place status line.
pub fn status_line(rate: &TransferRate, current: u64, total: u64) -> String {
    format!(
        "Uploaded at {}, {}/{}",
        rate.rate(current),
        comma(current),
        comma(total)
    )
}

/// Prints upload progress to stdout on a single overwritten line.
#[derive(Debug)]
pub struct ConsoleProgress {
    rate: Cell<TransferRate>,
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            rate: Cell::new(TransferRate::start()),
        }
    }

    /// Restart the rate meter. Call this when the content transfer begins.
    pub fn begin(&self) {
        self.rate.set(TransferRate::start());
    }

    /// Redraw the status line. Write errors on stdout are ignored.
    pub fn update(&self, current: u64, total: u64) {
        let line = status_line(&self.rate.get(), current, total);
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{}\r", line);
        let _ = stdout.flush();
    }

    /// Final line once the upload is complete.
    pub fn summary(&self, name: &str, bytes: u64) -> String {
        format!(
            "Uploaded '{}' at {}, total {}",
            name,
            self.rate.get().rate(bytes),
            format_size(bytes, false)
        )
    }
}
