//! CLI entry point for `mboxdex`.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mboxdex::config::{self, Config};
use mboxdex::error::MboxError;
use mboxdex::index::{self, IndexProgress, IndexSummary};
use mboxdex::pager::{LineInput, Palette, Session, SessionOptions, TerminalInput};
use mboxdex::store::{ArchiveReader, IndexStore};

#[derive(Parser)]
#[command(
    name = "mboxdex",
    version,
    about = "Full-text search over MBOX archives",
    long_about = "Index an MBOX archive once into a SQLite FTS5 store that sits next to it, \
                  then search and read messages straight from the original file."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or extend the index of an MBOX archive
    Index {
        archive: PathBuf,
    },
    /// Search an indexed archive and browse the results
    Search {
        archive: PathBuf,
        query: String,
        /// Results per page (overrides the config file)
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
        /// Print the hits as JSON instead of starting the pager
        #[arg(long)]
        json: bool,
    },
    /// Print one indexed message
    Show {
        archive: PathBuf,
        id: i64,
        /// Print the exact bytes stored in the archive
        #[arg(long)]
        raw: bool,
        /// Highlight this term in the body
        #[arg(long, value_name = "TERM")]
        highlight: Option<String>,
    },
    /// Show index statistics
    Stats {
        archive: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match config::load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);
    if let Some(e) = config_error {
        tracing::warn!(error = %format!("{e:#}"), "Using default configuration");
    }

    match cli.command {
        Commands::Index { archive } => cmd_index(&archive, &config),
        Commands::Search {
            archive,
            query,
            page_size,
            json,
        } => cmd_search(&archive, &query, page_size, json, &config),
        Commands::Show {
            archive,
            id,
            raw,
            highlight,
        } => cmd_show(&archive, id, raw, highlight.as_deref(), &config),
        Commands::Stats { archive, json } => cmd_stats(&archive, json),
        Commands::Config { save } => cmd_config(&config, save),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = log_path.parent().unwrap_or(Path::new("."));
    let log_name = log_path.file_name().unwrap_or(log_path.as_os_str());
    if std::fs::create_dir_all(log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxdex", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        config::save_config(config)?;
        if let Some(path) = config::config_file_path() {
            eprintln!("  Saved to {}", path.display());
        }
    }
    Ok(())
}

/// Index an MBOX archive and print a summary.
fn cmd_index(archive: &Path, config: &Config) -> anyhow::Result<()> {
    if !archive.is_file() {
        anyhow::bail!("MBOX file not found: {}", archive.display());
    }

    let file_size = std::fs::metadata(archive)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Indexing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );

    let store_path = index::index_path_for(archive);
    let summary = index::build_index(
        archive,
        &store_path,
        &config.index.options(),
        Some(&|p: &IndexProgress| {
            pb.set_length(p.file_size);
            pb.set_position(p.bytes_read);
            if p.processed % 100 == 0 {
                pb.set_message(format!("{} messages", p.processed));
            }
        }),
    )?;
    pb.finish_and_clear();

    print_index_summary(archive, file_size, &summary);
    Ok(())
}

fn print_index_summary(archive: &Path, file_size: u64, summary: &IndexSummary) {
    let store_size = std::fs::metadata(&summary.store_path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!();
    println!("  {:<20} {}", "Archive", archive.display());
    println!("  {:<20} {}", "Archive size", format_size(file_size, BINARY));
    println!("  {:<20} {}", "Messages processed", summary.processed);
    println!("  {:<20} {}", "Inserted", summary.inserted);
    println!("  {:<20} {}", "Duplicates", summary.duplicates);
    println!("  {:<20} {}", "Failed", summary.failed);
    println!("  {:<20} {}", "Index", summary.store_path.display());
    println!("  {:<20} {}", "Index size", format_size(store_size, BINARY));
    println!("  {:<20} {:.2?}", "Time", summary.elapsed);
    println!();
}

/// Open the store next to `archive`, turning a missing store into a
/// message that tells the user how to create it.
fn open_store(archive: &Path) -> anyhow::Result<IndexStore> {
    let store_path = index::index_path_for(archive);
    match IndexStore::open_read_only(&store_path) {
        Ok(store) => Ok(store),
        Err(MboxError::IndexNotFound(path)) => anyhow::bail!(
            "Index file not found at {}\nPlease run `mboxdex index {}` first.",
            path.display(),
            archive.display()
        ),
        Err(e) => Err(e.into()),
    }
}

fn use_color(config: &Config) -> bool {
    config.pager.color && std::io::stdout().is_terminal()
}

/// Search the index and browse or print the hits.
fn cmd_search(
    archive: &Path,
    query: &str,
    page_size: Option<usize>,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let store = open_store(archive)?;
    let hits = store.search(query)?;
    tracing::info!(query, hits = hits.len(), "Search complete");

    if json {
        let output = serde_json::json!({
            "query": query,
            "result_count": hits.len(),
            "results": hits,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    let mut reader = ArchiveReader::with_cache_size(archive, config.display.cache_size)?;
    let mut options = SessionOptions::from(config);
    if let Some(n) = page_size {
        options.page_size = n;
    }
    options.palette = Palette::new(use_color(config));

    let stdout = std::io::stdout();
    if std::io::stdin().is_terminal() {
        Session::new(
            &store,
            &mut reader,
            query,
            hits,
            options,
            TerminalInput::new(),
            stdout.lock(),
        )
        .run()
    } else {
        Session::new(
            &store,
            &mut reader,
            query,
            hits,
            options,
            LineInput::new(std::io::stdin().lock()),
            stdout.lock(),
        )
        .run()
    }
}

/// Print one message by id.
fn cmd_show(
    archive: &Path,
    id: i64,
    raw: bool,
    highlight: Option<&str>,
    config: &Config,
) -> anyhow::Result<()> {
    let store = open_store(archive)?;
    let record = store.record(id)?.ok_or(MboxError::MessageNotFound(id))?;
    let mut reader = ArchiveReader::with_cache_size(archive, 1)?;

    let mut stdout = std::io::stdout().lock();
    if raw {
        let bytes = reader.raw_message(&record)?;
        stdout.write_all(&bytes)?;
    } else {
        let message = reader.decoded_message(&record)?;
        mboxdex::pager::render::render_message(
            &mut stdout,
            message,
            highlight.unwrap_or(""),
            Palette::new(use_color(config)),
        )?;
    }
    stdout.flush()?;
    Ok(())
}

/// Print index statistics.
fn cmd_stats(archive: &Path, json: bool) -> anyhow::Result<()> {
    let store = open_store(archive)?;
    let coverage = store.coverage()?;
    let fulltext = store.fulltext_count()?;
    let archive_size = std::fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
    let store_size = std::fs::metadata(store.path())
        .map(|m| m.len())
        .unwrap_or(0);
    let percent = if archive_size == 0 {
        0.0
    } else {
        coverage.indexed_bytes as f64 / archive_size as f64 * 100.0
    };

    if json {
        let stats = serde_json::json!({
            "archive": archive.to_string_lossy(),
            "archive_size": archive_size,
            "index": store.path().to_string_lossy(),
            "index_size": store_size,
            "message_count": coverage.records,
            "fulltext_entries": fulltext,
            "first_offset": coverage.first_offset,
            "last_offset": coverage.last_offset,
            "indexed_bytes": coverage.indexed_bytes,
            "coverage_percent": percent,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "Archive", archive.display());
    println!("  {:<20} {}", "Archive size", format_size(archive_size, BINARY));
    println!("  {:<20} {}", "Index", store.path().display());
    println!("  {:<20} {}", "Index size", format_size(store_size, BINARY));
    println!("  {:<20} {}", "Messages", coverage.records);
    println!("  {:<20} {}", "Full-text entries", fulltext);
    println!(
        "  {:<20} {} ({:.1}%)",
        "Indexed bytes",
        format_size(coverage.indexed_bytes, BINARY),
        percent
    );
    if coverage.records > 0 {
        println!(
            "  {:<20} {}..{}",
            "Byte range", coverage.first_offset, coverage.last_offset
        );
    }
    println!();
    Ok(())
}
