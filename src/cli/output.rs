// Output formatting and display for CLI

use crate::config::LoggerConfig;
use chrono::{DateTime, Local};
use colored::*;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a table of a channel's log files, oldest first
pub fn print_file_table(channel: &str, files: &[PathBuf]) {
    if files.is_empty() {
        println!(
            "{}",
            format!("No log files for channel {}", channel).yellow()
        );
        return;
    }

    #[derive(Tabled)]
    struct FileRow {
        #[tabled(rename = "File")]
        name: String,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Modified")]
        modified: String,
    }

    let rows: Vec<FileRow> = files
        .iter()
        .map(|path| {
            let metadata = std::fs::metadata(path).ok();
            FileRow {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size: metadata
                    .as_ref()
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|| "-".to_string()),
                modified: metadata
                    .and_then(|m| m.modified().ok())
                    .map(|t| {
                        let datetime: DateTime<Local> = t.into();
                        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
                    })
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!(
        "{}",
        format!("Channel {}: {} file(s)", channel.cyan(), files.len())
            .dimmed()
            .italic()
    );
}

/// Print the resolved configuration
pub fn print_config(config: &LoggerConfig) {
    println!("\n{}", "Configuration".bold().underline());
    println!();
    println!("  {:<18} {}", "Channel:".bold(), config.channel.cyan());
    println!(
        "  {:<18} {}",
        "Log directory:".bold(),
        config.resolve_log_dir().display()
    );
    if let Some(ref dir) = config.log_dir {
        let status = if dir.is_dir() {
            "in use".green()
        } else {
            "missing, using default".yellow()
        };
        println!(
            "  {:<18} {} ({})",
            "Configured dir:".bold(),
            dir.display(),
            status
        );
    }
    println!("  {:<18} {}", "Rotate:".bold(), config.rotate);
    println!("  {:<18} {:?}", "Rotation:".bold(), config.rotation);
    println!("  {:<18} {}", "Max files:".bold(), config.max_files);
    println!("  {:<18} {}", "Context:".bold(), config.include_context);
    println!("  {:<18} {}", "Level:".bold(), config.level);
    println!();

    if config.max_files == 0 {
        print_info("Rotated files are never pruned (max_files = 0)");
    }
}

/// Format a byte count for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}
