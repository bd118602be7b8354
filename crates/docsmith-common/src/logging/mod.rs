//! Unified logging initialization for Docsmith binaries
//!
//! The filter is chosen in this order:
//! 1. CLI flags (`-v/-q`)
//! 2. RUST_LOG environment variable
//! 3. Binary-specific default

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified verbosity level and default filter.
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{InfoLevel, Verbosity};
/// use docsmith_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "docsmith_api=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = build_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

fn build_filter<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<EnvFilter> {
    let filter = if let Some(log_level) = verbosity.log_level() {
        EnvFilter::try_new(format!("{}", log_level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    Ok(filter)
}

/// Mask a secret for log output, keeping a short prefix only
pub fn mask_secret(secret: &str) -> String {
    const VISIBLE: usize = 6;
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.char_indices().nth(VISIBLE) {
        Some((idx, _)) if trimmed.len() > VISIBLE * 2 => format!("{}...", &trimmed[..idx]),
        _ => "*".repeat(trimmed.chars().count().min(8)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use clap_verbosity_flag::InfoLevel;

    #[derive(Parser)]
    struct Args {
        #[command(flatten)]
        verbosity: Verbosity<InfoLevel>,
    }

    #[test]
    fn test_verbose_flag_builds_filter() {
        let args = Args::parse_from(["docsmith", "-vv"]);
        assert!(build_filter(&args.verbosity, "docsmith_api=info").is_ok());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("ya29.a0AfH6SMBabcdefgh"), "ya29.a...");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret("   "), "");
    }
}
