//! Campaign Import CLI - merge ad-platform exports into the campaign store
//!
//! # Main Commands
//!
//! ```bash
//! campaign-import serve                      # Start HTTP server (port 3000)
//! campaign-import import spring.csv          # Import a CSV/TSV file or zip bundle
//! campaign-import history                    # List past imports
//! campaign-import snapshots "Spring Sale"    # List snapshots of a campaign
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! campaign-import parse spring.csv           # Parse to JSON rows
//! campaign-import fold spring.csv            # Show resolved columns and the draft tree
//! ```

use clap::{Parser, Subcommand};
use campaign_import::{
    fold_rows, import_file, list_snapshots, parse_file_auto, AppConfig, CanonicalField,
    ColumnSchema, ImportDefaults, ImportOptions, Store,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "campaign-import")]
#[command(about = "Reconcile campaign spreadsheet exports into a campaign store", long_about = None)]
struct Cli {
    /// SQLite database (default: $CAMPAIGN_IMPORT_DB or .campaign-import/campaigns.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV/TSV export or a zip bundle of them
    Import {
        /// Input file
        input: PathBuf,

        /// Merge into existing campaigns and ad groups instead of skipping them
        #[arg(long)]
        update_existing: bool,

        /// Do not snapshot campaigns before importing into them
        #[arg(long)]
        no_snapshot: bool,

        /// Write the import result JSON here (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse an export file and output JSON rows
    Parse {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve columns and fold rows without touching the store
    Fold {
        /// Input file
        input: PathBuf,
    },

    /// List import records, newest first
    History {
        /// Show at most this many records
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List snapshots of a campaign
    Snapshots {
        /// Campaign name
        campaign: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $CAMPAIGN_IMPORT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let result = match cli.command {
        Commands::Import {
            input,
            update_existing,
            no_snapshot,
            output,
        } => cmd_import(&config, &input, update_existing, !no_snapshot, output.as_deref()),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Fold { input } => cmd_fold(&input),

        Commands::History { limit } => cmd_history(&config, limit),

        Commands::Snapshots { campaign } => cmd_snapshots(&config, &campaign),

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(&config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn open_store(config: &AppConfig) -> Result<Store, Box<dyn std::error::Error>> {
    eprintln!("🗄️  Store: {}", config.db_path.display());
    Ok(Store::open(&config.db_path)?)
}

fn cmd_import(
    config: &AppConfig,
    input: &Path,
    update_existing: bool,
    create_snapshot: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input.display());

    let mut store = open_store(config)?;
    let options = ImportOptions {
        update_existing,
        create_snapshot,
        ..ImportOptions::default()
    };

    let result = import_file(&mut store, input, &options);

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, output)?;

    if !result.success {
        eprintln!("\n⚠️  Import finished with {} error(s):", result.errors.len());
        for issue in result.errors.iter().take(10) {
            eprintln!("   - {}", issue);
        }
        std::process::exit(2);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let result = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_fold(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Folding: {}", input.display());

    let defaults = ImportDefaults::default();
    let parsed = parse_file_auto(input)?;
    let schema = ColumnSchema::resolve_with(&parsed.headers, &defaults);

    eprintln!("\n🔎 Columns:");
    for (field, header) in schema.resolved() {
        eprintln!("   {:<18} ← {}", field.to_string(), header);
    }
    if !schema.unmapped().is_empty() {
        eprintln!("   (ignored: {})", schema.unmapped().join(", "));
    }
    if !schema.has(CanonicalField::CampaignName) {
        return Err("no campaign name column found".into());
    }

    let folded = fold_rows(&schema, &parsed.rows, &defaults);
    eprintln!(
        "\n📦 {} rows → {} campaign(s), {} ad group(s), {} keyword(s), {} ad(s)",
        folded.rows_read,
        folded.campaigns.len(),
        folded.ad_group_count(),
        folded.keyword_count(),
        folded.ad_count()
    );

    let tree: Vec<_> = folded
        .campaigns
        .iter()
        .map(|c| {
            json!({
                "campaign": c.name,
                "status": c.status.map(|s| s.as_str()),
                "dailyBudget": c.daily_budget,
                "adGroups": c.ad_groups.iter().map(|g| json!({
                    "name": g.name,
                    "maxCpc": g.max_cpc,
                    "keywords": g.keywords.iter().map(|k| json!({
                        "text": k.text,
                        "matchType": k.match_type.as_str(),
                    })).collect::<Vec<_>>(),
                    "ads": g.ads.iter().map(|a| json!({
                        "headlines": a.headlines,
                        "descriptions": a.descriptions,
                    })).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&tree)?);

    for issue in &folded.errors {
        eprintln!("   ❌ {}", issue);
    }
    for issue in &folded.warnings {
        eprintln!("   ⚠️  {}", issue);
    }

    Ok(())
}

fn cmd_history(config: &AppConfig, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let records = store.repository().list_import_records()?;

    if records.is_empty() {
        eprintln!("📋 No imports yet.");
        return Ok(());
    }

    eprintln!("📋 Imports ({}):\n", records.len());
    for r in records.iter().take(limit) {
        println!("  📄 {} ({})", r.source_name, r.id);
        println!("     Status: {}  Entities: {}  Errors: {}", r.status.as_str(), r.entity_count, r.errors.len());
        println!("     Started: {}", r.created_at);
        if let Some(done) = r.completed_at {
            println!("     Finished: {}", done);
        }
        println!();
    }

    Ok(())
}

fn cmd_snapshots(config: &AppConfig, campaign_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let repo = store.repository();

    let campaign = repo
        .find_campaign_by_name(campaign_name)?
        .ok_or_else(|| format!("Campaign not found: {}", campaign_name))?;
    let snapshots = list_snapshots(&repo, &campaign.id)?;

    if snapshots.is_empty() {
        eprintln!("📋 No snapshots for '{}'.", campaign_name);
        return Ok(());
    }

    eprintln!("📋 Snapshots of '{}' ({}):\n", campaign_name, snapshots.len());
    for s in &snapshots {
        println!("  📸 {} [{}] {}", s.id, s.snapshot_type.as_str(), s.created_at);
        println!("     {}", s.description);
        println!(
            "     {} ad group(s), {} keyword(s), {} ad(s)",
            s.data.ad_groups.len(),
            s.data.keyword_count(),
            s.data.ad_count()
        );
    }

    Ok(())
}

async fn cmd_serve(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    campaign_import::server::start_server(store, config.port).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
