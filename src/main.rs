// src/main.rs
// =============================================================================
// Entry point of repo-slice.
//
// What happens here:
// 1. Set up logging (REPO_SLICE_LOG, default "warn", written to stderr)
// 2. Load the platform / format tables and parse the command line
// 3. Resolve the repository reference and, except for --check, walk it
// 4. Print JSON or a tree, or download the slice
// 5. Exit with a proper code (0 = success, 1 = resolution or usage failure,
//    2 = unexpected error)
//
// Rust concepts used:
// - async/await: every API call and download is asynchronous
// - anyhow::Error::downcast_ref: telling our own errors apart from the rest
// =============================================================================

mod cli;
mod config;
mod download;
mod error;
mod github;
mod pipeline;
mod report;
mod structure;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Mode};
use config::Config;
use download::Downloader;
use pipeline::Request;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "REPO_SLICE_LOG";

#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            // Our own errors mean the request could not be resolved; anything
            // else is unexpected
            if e.downcast_ref::<error::Error>().is_some() {
                1
            } else {
                2
            }
        }
    };

    std::process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::load(cli.config_dir.as_deref()).context("Error loading configuration")?;
    let request = cli.to_request(&config.formats)?;

    match cli.mode() {
        Mode::Check => handle_check(&request, &config).await,
        Mode::Info => handle_info(&request, &config).await,
        Mode::Tree => handle_tree(&request, &config).await,
        Mode::Download => handle_download(&request, &config, &cli.output_dir(), false).await,
        Mode::Silent => handle_download(&request, &config, &cli.output_dir(), true).await,
    }
}

// --check: a missing path is an answer, not a failure
async fn handle_check(request: &Request, config: &Config) -> Result<i32> {
    match pipeline::resolve(request, &config.platforms).await {
        Ok(_) => println!("{}", report::exists_json(true)),
        Err(e) if e.is_not_found() => println!("{}", report::exists_json(false)),
        Err(e) => return Err(e.into()),
    }
    Ok(0)
}

async fn handle_info(request: &Request, config: &Config) -> Result<i32> {
    let discovery = pipeline::discover(request, &config.platforms).await?;
    let json = report::info_json(&discovery.reference, &discovery.structure)
        .context("Error serializing repository info")?;
    println!("{}", json);
    Ok(0)
}

async fn handle_tree(request: &Request, config: &Config) -> Result<i32> {
    let discovery = pipeline::discover(request, &config.platforms).await?;
    print!("{}", report::render_tree(&discovery.structure));
    Ok(0)
}

async fn handle_download(
    request: &Request,
    config: &Config,
    output_dir: &Path,
    silent: bool,
) -> Result<i32> {
    let discovery = pipeline::discover(request, &config.platforms).await?;
    let structure = &discovery.structure;

    if !silent {
        println!(
            "{}\n",
            report::download_header(&discovery.reference, structure, &request.filter, output_dir)
        );
    }

    let downloader = Downloader::new(discovery.client, request.concurrency);
    let outcome = downloader
        .download(structure, output_dir, |done, total| {
            if !silent {
                eprint!("\r{}", report::progress_bar(done, total));
            }
        })
        .await?;

    if !silent {
        if !structure.files.is_empty() {
            eprintln!();
        }
        for line in report::outcome_lines(&outcome) {
            println!("{}", line);
        }
        println!("DONE");
    }
    Ok(0)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does run() return anyhow::Result but the library uses error::Error?
//    - Library code needs precise variants (NotFound drives --check).
//    - The entry point only needs "print it and pick an exit code", which is
//      what anyhow is good at. `?` converts one into the other.
//
// 2. Why is the progress bar on stderr?
//    - stdout stays clean for the summary lines and for piping JSON.
//
// 3. Why is a failed file not an error exit?
//    - Downloads are best effort. Every failure is listed in the outcome
//      lines; only an unusable output directory stops the run.
// -----------------------------------------------------------------------------
