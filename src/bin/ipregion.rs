//! ipregion: interactive search and ground-truth bench over an xdb file.

use clap::{Parser, Subcommand};
use ipregion::{bench, CachePolicy, Searcher, SearcherConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ipregion")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "ip2region xdb searcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search addresses typed on stdin
    Search {
        /// ip2region binary xdb file path
        #[arg(long)]
        db: String,

        /// Cache policy: file/vectorIndex/content
        #[arg(long, default_value = "vectorIndex")]
        cache_policy: CachePolicy,

        /// Memory-map the file for the content policy
        #[arg(long)]
        mmap: bool,
    },

    /// Validate lookups against a `start|end|region` source file
    Bench {
        /// ip2region binary xdb file path
        #[arg(long)]
        db: String,

        /// Source ip text file path
        #[arg(long)]
        src: String,

        /// Cache policy: file/vectorIndex/content
        #[arg(long, default_value = "vectorIndex")]
        cache_policy: CachePolicy,

        /// Memory-map the file for the content policy
        #[arg(long)]
        mmap: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Search {
            db,
            cache_policy,
            mmap,
        } => run_search(&db, config(cache_policy, mmap)),
        Commands::Bench {
            db,
            src,
            cache_policy,
            mmap,
            json,
        } => run_bench(&db, &src, config(cache_policy, mmap), json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn config(cache_policy: CachePolicy, mmap: bool) -> SearcherConfig {
    let config = SearcherConfig::with_policy(cache_policy);
    if mmap {
        config.mmap()
    } else {
        config
    }
}

/// Expand a bare `~` or a leading `~/` against `$HOME`.
///
/// `~user` paths are left untouched.
fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => PathBuf::from(path),
    }
}

fn run_search(db: &str, config: SearcherConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = expand_home(db);
    let searcher = Searcher::open(&db_path, &config)?;

    println!(
        "ip2region xdb searcher test program\nsource xdb: {} ({}, {})\ntype 'quit' to exit",
        db_path.display(),
        searcher.ip_version(),
        config.cache_policy
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("ip2region>> ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }

        let io_before = searcher.io_count();
        let started = Instant::now();
        match searcher.search_by_str(line) {
            Ok(region) => println!(
                "\x1b[0;32m{{region: {}, ioCount: {}, took: {:?}}}\x1b[0m",
                region,
                searcher.io_count() - io_before,
                started.elapsed()
            ),
            Err(e) => println!(
                "\x1b[0;31m{{err: {}, ioCount: {}}}\x1b[0m",
                e,
                searcher.io_count() - io_before
            ),
        }
    }

    searcher.close();
    println!("searcher test program exited, thanks for trying");
    Ok(())
}

fn run_bench(
    db: &str,
    src: &str,
    config: SearcherConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let searcher = Searcher::open(&expand_home(db), &config)?;
    let source = File::open(expand_home(src))?;

    let report = bench::run(&searcher, BufReader::new(source))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    searcher.close();
    Ok(())
}
