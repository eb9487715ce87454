mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Content validation and image optimization for a personal site", long_about = None)]
struct Cli {
    /// Project root containing folio.toml
    #[arg(long, short = 'C', global = true, default_value = ".")]
    root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold folio.toml and the content directories
    Init,
    /// Validate the site configuration and every content collection
    Check {
        #[arg(long)]
        watch: bool,
    },
    /// Write all validated content as JSON
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the registered collection schemas
    Schema { collection: Option<String> },
    /// Re-encode public/opt/images/*.{jpg,png,jpeg} as WebP
    OptimizeImages,
}

/// A non-empty `RUST_LOG` wins; otherwise `-v` picks the level.
fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|directives| !directives.trim().is_empty()) {
        return EnvFilter::new(directives);
    }

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    EnvFilter::new(level.as_str())
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(verbose, rust_log.as_deref()))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.root.as_path();
    let result = match cli.command {
        Commands::Init => commands::init_site(root),
        Commands::Check { watch: false } => commands::check_site(root).map(drop),
        Commands::Check { watch: true } => commands::watch_site(root),
        Commands::Export { output } => commands::export_content(root, output.as_deref()),
        Commands::Schema { collection } => commands::print_schema(collection.as_deref()),
        Commands::OptimizeImages => commands::optimize_images(root),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_verbosity() {
        let filter = log_filter(0, Some("debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(3, Some("folio_site=info"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_verbosity_without_rust_log() {
        assert_eq!(log_filter(0, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(log_filter(1, Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(2, None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(7, None).max_level_hint(), Some(LevelFilter::TRACE));
    }
}
