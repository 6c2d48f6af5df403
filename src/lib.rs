//! The library code for the `quill` static blog generator. A build is a single
//! synchronous pass:
//!
//! 1. Resolving the [`config::Config`] for a source directory
//! 2. Loading the page templates ([`crate::template`])
//! 3. Collecting the posts ([`crate::parser`]): each source file is parsed
//!    into a [`post::ParsedPost`], unpublished posts are dropped, dates are
//!    parsed ([`post::DatedPost`]), posts are sorted most recent first and
//!    finally assigned their URLs ([`post::Post`], [`crate::url`])
//! 4. Writing the pages ([`crate::write`]): one page per post, an archive
//!    page and a home page, all wrapped in the same master template
//! 5. Copying static files into the output directory
//!
//! [`build::build_site`] runs all of these.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod template;
pub mod url;
pub mod write;

/// Installs the global [`tracing`] subscriber. `verbose` sets the minimum
/// level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE); `RUST_LOG` directives
/// are honored on top of it.
pub fn init_tracing(verbose: u64) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
