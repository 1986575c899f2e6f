#![allow(dead_code)]
//! # Shop Assistant — Storefront Chat Service
//!
//! **Main entry point.** Loads configuration and data, wires the turn
//! engine and starts the HTTP server.
//!
//! ## Startup
//!
//! ```text
//! main()
//!   ├── tracing (RUST_LOG, default info)
//!   ├── load_config()      defaults → assistant.toml → ASSISTANT_* env
//!   ├── load_store()       data/assistant.json (missing/corrupt → empty)
//!   ├── load_catalog()     data/catalog.json   (missing → empty)
//!   ├── FaqMatcher         static table (+ DynamicFaqs when faq.page_url set)
//!   ├── Orchestrator       store + catalog + SmtpNotifier
//!   ├── bind server.bind and serve
//!   └── spawn_blocking: warm the dynamic FAQ cache
//! ```
//!
//! The server accepts traffic before the FAQ page has been fetched; until
//! then the static table answers alone.
//!
//! ```bash
//! RUST_LOG=debug ASSISTANT_FAQ_PAGE_URL=https://shop.example/faqs/ cargo run
//! ```

/// Sessions, messages, leads and the storage trait.
mod core;

/// Lightweight NLU: normalisation, keyword extraction, intent rules.
mod nlu;

/// Static and scraped FAQ tables with fuzzy matching.
mod faq;

/// Consent → contact → lead sub-dialogue.
mod dialogue;

/// Product, order and notification collaborators.
mod services;

/// Composes a reply for one incoming message.
mod orchestrator;

mod analytics;
mod config;
mod markup;
mod persistence;
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::core::ChatStore;
use crate::faq::{DynamicFaqs, FaqMatcher, HttpFaqSource};
use crate::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::services::SmtpNotifier;
use crate::web::state::{AppState, Snapshotter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("🛍️ Shop Assistant — Starting...");

    let config = config::load_config().context("invalid configuration")?;

    let store = Arc::new(persistence::load_store(&config.storage.data_path)?);
    let catalog = Arc::new(persistence::load_catalog(&config.storage.catalog_path)?);

    let mut faqs = FaqMatcher::new(config.faq.match_threshold);
    if let Some(url) = &config.faq.page_url {
        let source = HttpFaqSource::new(url.clone(), config.faq.fetch_timeout());
        faqs = faqs.with_dynamic(DynamicFaqs::new(Box::new(source), config.faq.cache_ttl()));
        tracing::info!(url = %url, ttl_secs = config.faq.cache_ttl_secs, "dynamic FAQs enabled");
    }

    let settings = OrchestratorSettings {
        session_timeout: config.session.timeout(),
        lead_source: config.leads.source.clone(),
        handoff_url: config.handoff_url.clone(),
    };
    let chat_store: Arc<dyn ChatStore> = store.clone();
    let orchestrator = Arc::new(Orchestrator::new(
        chat_store,
        faqs,
        catalog.clone(),
        catalog,
        Arc::new(SmtpNotifier::new(config.leads.clone())),
        settings,
    ));

    let state = AppState {
        orchestrator: orchestrator.clone(),
        store,
        snapshots: Arc::new(Snapshotter::new(config.storage.data_path.clone())),
    };
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(bind = %config.server.bind, "🚀 Server running");

    tokio::task::spawn_blocking(move || {
        let count = orchestrator.faqs().warm_up();
        tracing::info!(dynamic_faqs = count, "✅ FAQ cache ready");
    });

    axum::serve(listener, app).await?;

    Ok(())
}
