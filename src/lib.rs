//! Dramatis — incremental character analysis for long-form text.
//!
//! Splits a book's pages into token-budgeted paragraph batches, runs each
//! batch through a caller-supplied extraction engine (a size-limited
//! generative model behind the [`pipeline::ExtractionEngine`] trait), and
//! merges the per-batch results into one de-duplicated view of every
//! character discovered so far — dialogs, traits, and voice profiles.

pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses.
///
/// Library consumers that install their own subscriber should skip this.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Dramatis v{}", config::APP_VERSION);
}
