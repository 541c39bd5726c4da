use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use scammerize::{
    config, logging,
    processing::{Artifact, SummarizationService, SummarizeRequest},
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "scammerize-file",
    about = "Summarize documents and images from disk"
)]
struct Cli {
    /// Files to summarize; directories require --recursive.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Declared mime type, instead of guessing from each file's extension.
    #[arg(long)]
    mime: Option<String>,
    /// Overall deadline per file, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Summarize every file below directory arguments.
    #[arg(long)]
    recursive: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_cli_tracing();

    let service = SummarizationService::from_config(config::get_config())
        .context("failed to build completion client")?;
    let files = collect_files(&cli.paths, cli.recursive)?;

    let mut failures = 0usize;
    for path in &files {
        match summarize_file(&service, path, &cli).await {
            Ok(summary) => println!("== {} ==\n{summary}\n", path.display()),
            Err(err) => {
                failures += 1;
                eprintln!("{}: {err:#}", path.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed", files.len());
    }
    Ok(())
}

fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        if !recursive {
            bail!("{} is a directory; pass --recursive", path.display());
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

async fn summarize_file(service: &SummarizationService, path: &Path, cli: &Cli) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime = match &cli.mime {
        Some(mime) => mime.clone(),
        None => mime_guess::from_path(path)
            .first_raw()
            .unwrap_or_default()
            .to_string(),
    };

    let mut request = SummarizeRequest::new(Artifact::new(bytes, filename, mime));
    if let Some(secs) = cli.timeout_secs {
        request = request.with_deadline(Duration::from_secs(secs));
    }

    let outcome = service.summarize(request).await?;
    tracing::debug!(
        path = %path.display(),
        chunks = outcome.chunk_count,
        completion_calls = outcome.completion_calls,
        "File summarized"
    );
    Ok(outcome.summary)
}
