//! cachedfile CLI - read files from a directory backend through the local cache
//!
//! Mostly useful for inspecting cache behavior from a shell.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cachedfile::{Backend, CacheConfig, CachedFile, DirectoryBackend, FileCache};

/// CLI command
#[derive(Debug)]
enum Command {
    /// Stream content to stdout
    Cat { backend_dir: PathBuf, id: String },
    /// Print size in bytes
    Size { backend_dir: PathBuf, id: String },
    /// Print whether the backend has the id
    Exists { backend_dir: PathBuf, id: String },
    /// Delete from the backend and the cache
    Delete { backend_dir: PathBuf, id: String },
    /// Copy the materialized file to a destination
    Download {
        backend_dir: PathBuf,
        id: String,
        dest: PathBuf,
    },
    /// Print the JSON summary
    Info { backend_dir: PathBuf, id: String },
    /// Remove stale temp files from the cache root
    Cleanup,
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"cachedfile - Read files through a local disk cache

USAGE:
    cachedfile cat <backend_dir> <id>
    cachedfile size <backend_dir> <id>
    cachedfile exists <backend_dir> <id>
    cachedfile delete <backend_dir> <id>
    cachedfile download <backend_dir> <id> <dest>
    cachedfile info <backend_dir> <id>
    cachedfile cleanup
    cachedfile help

COMMANDS:
    cat       Write the file content to stdout
    size      Print the size in bytes (cached copy first)
    exists    Print whether the backend has the file
    delete    Delete from the backend and drop the cached copy
    download  Copy a durable copy of the file to <dest>
    info      Print the JSON summary of the file
    cleanup   Remove stale temp files from the cache directory
    help      Show this help message

ENVIRONMENT:
    CACHEDFILE_ROOT              Cache directory (default: platform cache dir)
    CACHEDFILE_MIN_FREE_PERCENT  Free space to keep, in percent (default: 5)
    CACHEDFILE_ACCOUNTING        after-write or before-write (default: after-write)
    RUST_LOG                     Log level (trace, debug, info, warn, error)
"#
    );
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Help);
    }

    let target = |usage: &str| -> Result<(PathBuf, String)> {
        if args.len() < 4 {
            return Err(anyhow!("Usage: cachedfile {}", usage));
        }
        Ok((PathBuf::from(&args[2]), args[3].clone()))
    };

    match args[1].as_str() {
        "cat" => {
            let (backend_dir, id) = target("cat <backend_dir> <id>")?;
            Ok(Command::Cat { backend_dir, id })
        }
        "size" => {
            let (backend_dir, id) = target("size <backend_dir> <id>")?;
            Ok(Command::Size { backend_dir, id })
        }
        "exists" => {
            let (backend_dir, id) = target("exists <backend_dir> <id>")?;
            Ok(Command::Exists { backend_dir, id })
        }
        "delete" => {
            let (backend_dir, id) = target("delete <backend_dir> <id>")?;
            Ok(Command::Delete { backend_dir, id })
        }
        "download" => {
            let (backend_dir, id) = target("download <backend_dir> <id> <dest>")?;
            let dest = args
                .get(4)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("Usage: cachedfile download <backend_dir> <id> <dest>"))?;
            Ok(Command::Download {
                backend_dir,
                id,
                dest,
            })
        }
        "info" => {
            let (backend_dir, id) = target("info <backend_dir> <id>")?;
            Ok(Command::Info { backend_dir, id })
        }
        "cleanup" => Ok(Command::Cleanup),
        "help" | "--help" | "-h" => Ok(Command::Help),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            Ok(Command::Help)
        }
    }
}

fn open_file(cache: &Arc<FileCache>, backend_dir: PathBuf, id: String) -> CachedFile {
    let backend: Arc<dyn Backend> = Arc::new(DirectoryBackend::new(backend_dir));
    cache.open(backend, id)
}

fn main() -> Result<()> {
    // Initialize logging
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command
    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    if let Command::Help = command {
        print_help();
        return Ok(());
    }

    let config = CacheConfig::from_env().context("Invalid cache configuration")?;
    let cache = Arc::new(FileCache::new(&config));

    match command {
        Command::Cat { backend_dir, id } => {
            let mut file = open_file(&cache, backend_dir, id);
            let stream = file.stream().context("Failed to open file")?;
            io::copy(stream, &mut io::stdout().lock()).context("Failed to write to stdout")?;
            file.close();
        }
        Command::Size { backend_dir, id } => {
            let file = open_file(&cache, backend_dir, id);
            println!("{}", file.size().context("Failed to get size")?);
        }
        Command::Exists { backend_dir, id } => {
            let file = open_file(&cache, backend_dir, id);
            println!("{}", file.exists().context("Failed to check existence")?);
        }
        Command::Delete { backend_dir, id } => {
            let file = open_file(&cache, backend_dir, id);
            file.delete().context("Failed to delete file")?;
            info!(id = %file.id(), "Deleted");
        }
        Command::Download {
            backend_dir,
            id,
            dest,
        } => {
            let mut file = open_file(&cache, backend_dir, id);
            let source = file.download().context("Failed to download file")?;
            let mut out = File::create(&dest)
                .with_context(|| format!("Failed to create {}", dest.display()))?;
            let copied = io::copy(source, &mut out)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            out.sync_all()?;
            info!(id = %file.id(), dest = %dest.display(), size = copied, "Downloaded");
        }
        Command::Info { backend_dir, id } => {
            let file = open_file(&cache, backend_dir, id);
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
        Command::Cleanup => {
            let removed = cache.cleanup();
            println!("Removed {} stale temp file(s) from {}", removed, cache.cache_dir().display());
        }
        Command::Help => print_help(),
    }

    Ok(())
}
