//! # Briefit
//!
//! A weekly IT briefing: collects recent technology news from several
//! heterogeneous sources, has a language model write a Korean digest, and
//! emails it to the team.
//!
//! ## Sources
//!
//! Playwright releases (GitHub API), Hacker News (Algolia search), the TLDR
//! newsletter archive, the OpenAI blog feed, the Anthropic news page, and
//! Medium tag listings (headless browser, `browser` feature).
//!
//! ## Usage
//!
//! ```sh
//! briefit                    # collect, summarize, send
//! briefit --dry-run          # print the digest instead
//! briefit --test-email       # check the email setup only
//! ```
//!
//! ## Architecture
//!
//! The run is a linear pipeline:
//! 1. **Collecting**: Every enabled adapter runs in turn; a failing source
//!    contributes nothing instead of aborting the run
//! 2. **Grouping**: Items are grouped by source in a fixed presentation order
//! 3. **Summarizing**: The grouped items go to the chat model, or into a
//!    plain listing when no model is configured or the call fails
//! 4. **Delivery**: The digest is emailed via Resend (or printed)

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod browser;
mod cli;
mod config;
mod digest;
mod models;
mod outputs;
mod scrapers;
mod utils;

use api::{OpenAiChat, summarize};
use cli::Cli;
use config::Config;
use digest::{item_count, ordered_groups};
use outputs::email::{self, Mailer, weekly_subject};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("briefit starting up");
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded .env");
    }

    let config = Config::from_cli(Cli::parse())?;
    debug!(
        dry_run = config.dry_run,
        recipients = config.email_to.len(),
        summarizer = config.openai_api_key.is_some(),
        "Configuration ready"
    );

    let mailer = Mailer::new(
        email::DEFAULT_ENDPOINT,
        config.resend_api_key.clone(),
        config.email_from.clone(),
        config.email_to.clone(),
    );

    // ---- Configuration test only ----
    if let Some(to) = &config.test_email {
        match mailer.send_test(Some(to)).await {
            Ok(id) => info!(%id, "Test email delivered"),
            Err(e) => error!(error = %e, "Test email failed"),
        }
        return Ok(());
    }

    // ---- Collect ----
    let adapters = config
        .sources
        .adapters(config.medium_session_id.as_deref(), browser::detect)?;
    info!(adapters = adapters.len(), "Collecting news");
    let news = scrapers::collect_all(&adapters).await;

    // ---- Group ----
    let groups = ordered_groups(news);
    for group in &groups {
        info!(source = %group.source, count = group.items.len(), "Collected by source");
    }
    let total = item_count(&groups);
    info!(total, "Collection summary");
    if total == 0 {
        warn!("No items collected; the digest will be empty");
    }

    // ---- Summarize ----
    let asker = config
        .openai_api_key
        .as_deref()
        .map(|key| OpenAiChat::new(config.openai_endpoint.clone(), key, config.openai_model.clone()));
    let digest = summarize(asker.as_ref(), &groups).await;

    // ---- Deliver ----
    if config.dry_run {
        println!("{digest}");
    } else {
        let subject = weekly_subject(&Local::now());
        match mailer.send(&digest, &subject).await {
            Ok(id) => info!(%id, %subject, "Digest delivered"),
            Err(e) => error!(error = %e, "Digest delivery failed"),
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
