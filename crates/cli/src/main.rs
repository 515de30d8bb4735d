use clap::{Parser, Subcommand};
use ichi_core::config::{CoreConfig, resolve_data_file};
use ichi_core::{ClassificationService, RepairEngine, loader};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ichi")]
#[command(about = "ICHI classification index CLI")]
struct Cli {
    /// Taxonomy dataset file (falls back to ICHI_DATA_FILE, then taxonomy.json)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one entry by exact code
    Lookup {
        /// Classification code, case-sensitive
        code: String,
    },
    /// Free-text search over intervention titles
    Search {
        /// Search term (matched as a literal substring)
        term: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<i64>,
        /// Restrict to one depth-in-kind level (the server uses 1)
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Browse the taxonomy page by page
    List {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
        /// Sort field: code or title
        #[arg(long)]
        sort: Option<String>,
    },
    /// Repair malformed flat codes and persist the corrected dataset
    Repair {
        /// Report what would change without writing the dataset back
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_file = cli
        .data_file
        .or_else(|| std::env::var_os("ICHI_DATA_FILE").map(PathBuf::from));
    let config = CoreConfig::new(resolve_data_file(data_file))?;
    let store = loader::load_store(config.data_file())?;

    match cli.command {
        Commands::Lookup { code } => {
            let service = ClassificationService::new(store);
            match service.lookup(&code)? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => anyhow::bail!("Code not found: {code}"),
            }
        }
        Commands::Search { term, limit, depth } => {
            let service = ClassificationService::new(store);
            let res = service.search(&term, limit, depth)?;
            println!("{}", serde_json::to_string_pretty(&res)?);
        }
        Commands::List {
            limit,
            offset,
            sort,
        } => {
            let service = ClassificationService::new(store);
            let res = service.list(limit, offset, sort.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&res)?);
        }
        Commands::Repair { dry_run } => {
            let summary = RepairEngine::new(store.clone()).run()?;

            println!(
                "scanned {} entries, {} repair candidates",
                summary.scanned, summary.candidates
            );
            for c in &summary.corrected {
                println!("corrected {} -> {} (parent {})", c.old_code, c.new_code, c.parent_code);
            }
            for code in &summary.unresolved {
                println!("unresolved {code} (no inferable parent)");
            }
            for f in &summary.failed {
                println!("failed {}: {}", f.code, f.reason);
            }

            if dry_run {
                println!("dry run: dataset not written");
            } else if summary.corrected.is_empty() {
                println!("no corrections to persist");
            } else {
                loader::save_entries(config.data_file(), &store.snapshot()?)?;
                println!(
                    "wrote {} entries to {}",
                    store.len()?,
                    config.data_file().display()
                );
            }
        }
    }

    Ok(())
}
