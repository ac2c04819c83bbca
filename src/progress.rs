//! Progress bar and logging utilities.
//!
//! Source listings are paginated without a known total, so categories use a
//! counting spinner; playlists report their track count up front and get a
//! bar. In log-only mode both are hidden and progress goes to stderr at
//! fixed intervals instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Items between two log-only progress lines
pub const LOG_INTERVAL: u64 = 25;

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress bar for a known number of items. Hidden in log-only mode.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta})")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    pb.set_message(msg.to_string());
    pb
}

/// Spinner that counts processed items. Hidden in log-only mode.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} {pos} processed [{elapsed_precise}]")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Print a console line without tearing an active bar or spinner.
/// Hidden bars swallow `ProgressBar::println`, so suspend instead.
pub fn print_line(pb: &ProgressBar, line: &str) {
    pb.suspend(|| println!("{}", line));
}

/// Log progress periodically for tail-friendly output.
/// Only logs in log-only mode, every `interval` items and at the end when
/// the total is known.
pub fn log_progress(phase: &str, current: u64, total: Option<u64>, interval: u64) {
    if !is_log_only() || interval == 0 {
        return;
    }
    match total {
        Some(total) if current % interval == 0 || current == total => {
            let pct = if total == 0 {
                100.0
            } else {
                100.0 * current as f64 / total as f64
            };
            eprintln!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
        }
        None if current % interval == 0 => {
            eprintln!("[{}] {} processed", phase, current);
        }
        _ => {}
    }
}
