//! Man page generator for msmnand
//!
//! Writes `msmnand.1` plus one `msmnand-<command>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use clap_mangen::Man;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;
#[allow(dead_code)]
#[path = "../programmers.rs"]
mod programmers;

/// Page title and renderer for the top-level command and each subcommand
fn pages() -> Vec<(String, Man)> {
    let cmd = cli::Cli::command();
    let mut pages = vec![("msmnand".to_string(), Man::new(cmd.clone()))];
    for sub in cmd.get_subcommands() {
        let title = format!("msmnand-{}", sub.get_name());
        pages.push((title.clone(), Man::new(sub.clone()).title(title)));
    }
    pages
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let pages = pages();
    for (title, man) in &pages {
        let mut buffer = Vec::new();
        man.render(&mut buffer)?;
        fs::write(output_dir.join(format!("{}.1", title)), buffer)?;
    }

    let main_page = output_dir.join("msmnand.1");
    println!("{} man pages generated in {}", pages.len(), output_dir.display());
    println!("\nTo view the main page:");
    println!("  man -l {}", main_page.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_named_after_msmnand() {
        let pages = pages();
        assert!(pages.iter().all(|(title, _)| title.starts_with("msmnand")));
        assert!(pages.iter().any(|(title, _)| title == "msmnand-read-page"));

        let mut buffer = Vec::new();
        pages[0].1.render(&mut buffer).unwrap();
        let text = String::from_utf8_lossy(&buffer);
        assert!(text.contains("msmnand"));
    }
}
