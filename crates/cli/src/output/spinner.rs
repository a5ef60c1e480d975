use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use colored::Colorize;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

pub fn create(msg: &str) -> ProgressBar {
    let sp = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}") {
        sp.set_style(style.tick_strings(TICKS));
    }
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(Duration::from_millis(80));
    sp
}

pub fn finish_ok(sp: &ProgressBar, msg: &str) {
    plain(sp);
    sp.finish_with_message(format!("{} {}", "✓".green().bold(), msg));
}

pub fn finish_err(sp: &ProgressBar, msg: &str) {
    plain(sp);
    sp.finish_with_message(format!("{} {}", "✗".red().bold(), msg));
}

pub fn finish_clear(sp: &ProgressBar) {
    sp.finish_and_clear();
}

fn plain(sp: &ProgressBar) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        sp.set_style(style);
    }
}
