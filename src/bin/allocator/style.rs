//! Terminal styling on top of `console`, which drops colors when output
//! is not a terminal

use console::style;

pub fn style_cyan(s: &str) -> String {
    style(s).cyan().to_string()
}

pub fn style_green(s: &str) -> String {
    style(s).green().to_string()
}

pub fn style_red(s: &str) -> String {
    style(s).red().to_string()
}

pub fn style_yellow(s: &str) -> String {
    style(s).yellow().to_string()
}

pub fn style_dim(s: &str) -> String {
    style(s).dim().to_string()
}

pub fn style_bold(s: &str) -> String {
    style(s).bold().to_string()
}

pub fn print_success(msg: &str) {
    println!("  {} {}", style("✓").green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("  {} {}", style("✗").red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", style("!").yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("  {} {}", style("i").cyan(), msg);
}

pub fn print_header(title: &str) {
    let rule = "─".repeat(title.chars().count());
    println!("\n{}\n{}", style(title).bold(), style(rule).dim());
}

/// Shorten a wallet for tables: first 8 and last 6 characters.
/// Returns the full string if it's 16 characters or fewer.
pub fn truncate_wallet(wallet: &str) -> String {
    let chars: Vec<char> = wallet.chars().collect();
    if chars.len() > 16 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 6..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        wallet.to_string()
    }
}

/// Short id for display (first uuid group)
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}
