//! mirage - find similar album art or melodies from the command line
//!
//! ```bash
//! mirage image --query cover.jpg [--corpus DIR] [-n 10] [--json]
//! mirage audio --query tune.mid [--corpus DIR] [-n 30] [--json]
//! mirage list audio [--corpus DIR]
//! mirage init-config [--force]
//! ```
//!
//! Without `--corpus`, the corpus is `<root>/album_images` or
//! `<root>/music_audios` under the resolved root folder.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mirage_common::config::{
    audio_corpus_dir, default_config_path, image_corpus_dir, load_or_default, locate_config_file,
    write_toml_config, RetrievalSection, RootFolderResolver, TomlConfig, CONFIG_FILE_ENV,
};
use mirage_engine::config::{DEFAULT_COMPONENTS, DEFAULT_RESULT_COUNT};
use mirage_engine::services::CorpusLoader;
use mirage_engine::{MediaKind, RetrievalConfig, RetrievalContext, RetrievalEngine, RetrievalReport};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Content-based media retrieval
#[derive(Parser, Debug)]
#[clap(name = "mirage", version)]
#[clap(about = "Rank a corpus of images or MIDI melodies by similarity to a query")]
struct Cli {
    /// Config file (default: $MIRAGE_CONFIG, then <config dir>/mirage/mirage.toml)
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root folder holding album_images/ and music_audios/
    #[clap(long, global = true, value_name = "DIR")]
    root_folder: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[clap(long, global = true)]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find images similar to a query image
    Image(QueryArgs),
    /// Find melodies similar to a query MIDI file
    Audio(QueryArgs),
    /// List the eligible files of a corpus
    List {
        #[clap(value_enum)]
        kind: KindArg,

        /// Corpus directory
        #[clap(long, value_name = "DIR")]
        corpus: Option<PathBuf>,
    },
    /// Write a starter config file (to --config, $MIRAGE_CONFIG, or the
    /// platform config directory)
    InitConfig {
        /// Overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Query file
    #[clap(long, value_name = "FILE")]
    query: PathBuf,

    /// Corpus directory
    #[clap(long, value_name = "DIR")]
    corpus: Option<PathBuf>,

    /// Number of results
    #[clap(short = 'n', long)]
    count: Option<usize>,

    /// Print the full report as JSON
    #[clap(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Image,
    Audio,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Audio => MediaKind::Audio,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before the subscriber exists; its outcome is logged after
    let config_path = locate_config_file(cli.config.as_deref());
    let loaded = load_or_default(config_path.as_deref());

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| loaded.config.logging.level.clone());
    mirage_common::logging::init_tracing(&level)?;
    loaded.source.log();

    let toml_config = loaded.config;
    let root_folder = RootFolderResolver::new(cli.root_folder.clone()).resolve(&toml_config);
    let retrieval_config = RetrievalConfig::from_toml(&toml_config)?;

    match cli.command {
        Command::Image(args) => run_query(MediaKind::Image, args, &root_folder, retrieval_config).await,
        Command::Audio(args) => run_query(MediaKind::Audio, args, &root_folder, retrieval_config).await,
        Command::List { kind, corpus } => {
            let kind = MediaKind::from(kind);
            let corpus = corpus.unwrap_or_else(|| default_corpus_dir(kind, &root_folder));
            list_corpus(kind, &corpus, &retrieval_config)
        }
        Command::InitConfig { force } => init_config(cli.config, &root_folder, force),
    }
}

fn default_corpus_dir(kind: MediaKind, root_folder: &Path) -> PathBuf {
    match kind {
        MediaKind::Image => image_corpus_dir(root_folder),
        MediaKind::Audio => audio_corpus_dir(root_folder),
    }
}

async fn run_query(
    kind: MediaKind,
    args: QueryArgs,
    root_folder: &Path,
    config: RetrievalConfig,
) -> Result<()> {
    let corpus = args
        .corpus
        .unwrap_or_else(|| default_corpus_dir(kind, root_folder));
    let n = args.count.unwrap_or(config.result_count);

    let engine = RetrievalEngine::new(config)?;

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling retrieval");
            ctrl_c_token.cancel();
        }
    });

    let ctx = RetrievalContext::new().with_cancel_token(cancel_token);
    let report = engine
        .retrieve_async(kind, args.query.clone(), corpus, n, ctx)
        .await
        .with_context(|| format!("{} retrieval failed for {}", kind, args.query.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &RetrievalReport) {
    println!("score: {}", report.score_kind.label());
    for (rank, result) in report.results.iter().enumerate() {
        println!("{:>3}. {:<40} {:.6}", rank + 1, result.id, result.score);
    }
    println!(
        "\n{} of {} items usable, {} skipped, {} ms",
        report.usable_items,
        report.corpus_size,
        report.skipped.len(),
        report.elapsed_ms
    );
    for skipped in &report.skipped {
        println!(
            "  skipped {} [{}] {}",
            skipped.path.display(),
            skipped.error_code,
            skipped.error_message
        );
    }
}

fn list_corpus(kind: MediaKind, corpus: &Path, config: &RetrievalConfig) -> Result<()> {
    let result = CorpusLoader::new()
        .scan_with_stats(corpus, &config.extensions(kind))
        .with_context(|| format!("Cannot list {}", corpus.display()))?;

    for file in &result.files {
        println!("{}", file.display());
    }

    let mut formats: Vec<_> = result.by_format.iter().collect();
    formats.sort();
    let formats: Vec<String> = formats
        .into_iter()
        .map(|(ext, count)| format!("{} {}", count, ext))
        .collect();
    println!(
        "\n{} files ({}), {} bytes",
        result.files.len(),
        formats.join(", "),
        result.total_size
    );
    for error in &result.errors {
        println!("  {}", error);
    }

    Ok(())
}

fn init_config(cli_path: Option<PathBuf>, root_folder: &Path, force: bool) -> Result<()> {
    let target = cli_path
        .or_else(|| {
            std::env::var(CONFIG_FILE_ENV)
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
        })
        .or_else(default_config_path)
        .context("No config directory on this platform; pass --config")?;

    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }

    let config = TomlConfig {
        root_folder: Some(root_folder.to_path_buf()),
        retrieval: RetrievalSection {
            components: Some(DEFAULT_COMPONENTS),
            result_count: Some(DEFAULT_RESULT_COUNT),
            ..Default::default()
        },
        ..Default::default()
    };
    write_toml_config(&config, &target)
        .with_context(|| format!("Cannot write {}", target.display()))?;

    info!(path = %target.display(), "Wrote config file");
    println!("{}", target.display());
    Ok(())
}
