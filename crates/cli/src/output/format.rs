use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Prints `msg` followed by each cause in the chain.
pub fn print_error(msg: &str, err: &anyhow::Error) {
    eprintln!("{} {}", "✗".red().bold(), msg);
    for cause in err.chain() {
        eprintln!("    {} {}", "caused by:".dimmed(), cause);
    }
}
