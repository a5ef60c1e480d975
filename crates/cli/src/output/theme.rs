use colored::Colorize;

pub fn print_header(title: &str) {
    let width = title.len() + 6;
    let border = "─".repeat(width);
    println!();
    println!("  ╭{}╮", border.cyan());
    println!("  │   {}   │", title.bright_cyan().bold());
    println!("  ╰{}╯", border.cyan());
    println!();
}

pub fn print_kv(label: &str, value: &str) {
    println!(
        "    {} {}",
        format!("{:<18}", label).dimmed(),
        value.bright_white()
    );
}

pub fn print_kv_colored(label: &str, value: &str, ok: bool) {
    let styled = if ok {
        value.green().to_string()
    } else {
        value.red().to_string()
    };
    println!("    {} {}", format!("{:<18}", label).dimmed(), styled);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg.yellow());
}

pub fn print_dim(msg: &str) {
    println!("  {}", msg.dimmed());
}
