//! `analyze` command - run the pipeline over a directory of images.

use std::path::Path;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::discovery::discover_images;
use crate::llm::{CompletionBackend, LlmClient};
use crate::services::{AnalyzeEvent, AnalyzeService};
use crate::sink::JsonlSink;

pub async fn cmd_analyze(
    settings: &Settings,
    input: &Path,
    output: &Path,
    limit: usize,
) -> anyhow::Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input path {} is not a directory", input.display());
    }

    let discovered = discover_images(input)?;
    if discovered.skipped > 0 {
        println!(
            "{} Skipped {} unsupported or unreadable files",
            style("!").yellow(),
            discovered.skipped
        );
    }
    if discovered.images.is_empty() {
        println!(
            "{} No image files found in {}",
            style("!").yellow(),
            input.display()
        );
        return Ok(());
    }

    let mut images = discovered.images;
    if limit > 0 && images.len() > limit {
        images.truncate(limit);
    }
    let total = images.len();

    println!("{} Found {} images", style("→").cyan(), total);
    println!("  Model: {} at {}", settings.llm.model, settings.llm.api_base);
    println!("  Output: {}", output.display());
    println!("  Workers: {}", settings.workers);

    let sink = Arc::new(JsonlSink::create(output)?);
    let backend: Arc<dyn CompletionBackend> = Arc::new(LlmClient::new(settings.llm.clone()));
    let service = AnalyzeService::new(backend, sink);

    let (event_tx, mut event_rx) = mpsc::channel::<AnalyzeEvent>(100);

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    progress.set_message("Analyzing images...");

    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                AnalyzeEvent::Started { image_id, .. } => {
                    progress.set_message(image_id);
                }
                AnalyzeEvent::Completed { .. } => {
                    progress.inc(1);
                }
                AnalyzeEvent::Failed { image_id, error, .. } => {
                    progress.suspend(|| {
                        eprintln!("  {} {} failed: {}", style("✗").red(), image_id, error);
                    });
                    progress.inc(1);
                }
            }
        }
        progress.finish_and_clear();
    });

    let result = service.run(images, settings.workers, event_tx).await?;
    let _ = event_handler.await;

    println!(
        "{} Analyzed {} of {} images",
        style("✓").green(),
        result.succeeded,
        result.attempted
    );
    if result.failed > 0 {
        println!("  {} {} images failed", style("!").yellow(), result.failed);
    }
    println!("  Results written to {}", output.display());

    Ok(())
}
