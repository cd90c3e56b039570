//! `report` command - render analysis output for an operator.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::models::ImageRecord;
use crate::report::render_record;

pub fn cmd_report(input: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let mut rendered = 0usize;
    let mut malformed = 0usize;

    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        match serde_json::from_str::<ImageRecord>(line) {
            Ok(record) => {
                println!("{}", render_record(&record));
                rendered += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping malformed record line: {}", e);
                malformed += 1;
            }
        }
    }

    if rendered == 0 && malformed == 0 {
        println!("{} No records in {}", style("!").yellow(), input.display());
    } else if malformed > 0 {
        println!(
            "{} Skipped {} malformed lines",
            style("!").yellow(),
            malformed
        );
    }

    Ok(())
}
