//! Startup banner

use std::path::Path;

use super::config::{Environment, is_all_interfaces};
use super::constants::APP_NAME;

/// Print the startup banner with URLs
pub fn print_banner(host: &str, port: u16, environment: Environment, database: &Path) {
    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };
    let base = format!("http://{}:{}", display_host, port);

    const W: usize = 10;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{} ({})\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION"),
        environment
    );
    println!();
    println!("  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}", "API:", base);
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}/docs",
        "Docs:", base
    );
    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }
    println!(
        "  \x1b[90m➜  {:<W$} {}\x1b[0m",
        "Database:",
        database.display()
    );
    println!();
}
