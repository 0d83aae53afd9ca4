use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalog_dedup::cli::db_counts;
use catalog_dedup::database_ops::backfill_hashes::run_backfill;
use catalog_dedup::database_ops::db::PgProductStore;
use catalog_dedup::database_ops::dedup_pass::{run_pass, DedupPlan, DedupSummary};
use catalog_dedup::dedup::DedupConfig;
use catalog_dedup::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "dedup", version, about = "Catalog deduplication admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run a dedup pass: fingerprint the catalog, pick keepers, delete the rest
    Run {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Actually delete duplicates (default is a dry run)
        #[arg(long, default_value_t = false)]
        live: bool,
        /// Ids per delete batch (default: env DEDUP_BATCH_SIZE or 100)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Delay between batches in milliseconds (default: env DEDUP_BATCH_DELAY_MS or 250)
        #[arg(long)]
        delay_ms: Option<u64>,
        /// How many duplicate groups to print in the report
        #[arg(long)]
        sample: Option<usize>,
        /// Emit the plan and summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Backfill missing content hashes for re-sync change detection
    BackfillHashes {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Actually write hashes (default is a dry run)
        #[arg(long, default_value_t = false)]
        live: bool,
        /// Ids per update batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Maximum number of rows to backfill (default: all missing)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print catalog counts and brand/network breakdowns
    DbCounts {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Rows per breakdown
        #[arg(long)]
        top: Option<i64>,
        /// Emit machine-readable JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            db_url,
            live,
            batch_size,
            delay_ms,
            sample,
            json,
        } => {
            let mut cfg = DedupConfig::from_env();
            if let Some(v) = batch_size {
                cfg.batch_size = v;
            }
            if let Some(v) = delay_ms {
                cfg.batch_delay_ms = v;
            }
            if let Some(v) = sample {
                cfg.sample_groups = v;
            }

            let database_url = resolve_database_url(db_url)?;
            info!(url = %redact_postgres_url(&database_url), live, "dedup: connecting");
            let store = PgProductStore::connect(&database_url, 5).await?;

            let (plan, summary) = run_pass(&store, &cfg, live).await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "plan": &plan,
                        "summary": &summary,
                    }))?
                );
            } else {
                print_plan(&plan, &summary);
            }
        }
        Commands::BackfillHashes {
            db_url,
            live,
            batch_size,
            limit,
        } => {
            let mut cfg = DedupConfig::from_env();
            if let Some(v) = batch_size {
                cfg.batch_size = v;
            }

            let database_url = resolve_database_url(db_url)?;
            info!(url = %redact_postgres_url(&database_url), live, "backfill-hashes: connecting");
            let store = PgProductStore::connect(&database_url, 5).await?;

            let summary = run_backfill(&store, &cfg, live, limit).await?;
            info!(
                scanned = summary.scanned,
                planned = summary.planned,
                updated = summary.updated,
                failed_batches = summary.failed_batches,
                "backfill-hashes: completed"
            );
            if !live && summary.planned > 0 {
                println!(
                    "dry run: {} rows would be updated; re-run with --live to apply",
                    summary.planned
                );
            }
        }
        Commands::DbCounts { db_url, top, json } => {
            let cfg = db_counts::DbCountsConfig {
                database_url: db_url,
                top,
                json,
            };
            db_counts::run(cfg).await?;
        }
    }

    Ok(())
}

fn print_plan(plan: &DedupPlan, summary: &DedupSummary) {
    println!("deduplication analysis");
    println!("  total records:     {}", plan.total_records);
    println!("  unique products:   {}", plan.unique);
    println!("  duplicate groups:  {}", plan.duplicate_groups);
    println!("  duplicate records: {}", plan.duplicate_records);
    if plan.total_records > 0 {
        println!(
            "  duplication rate:  {:.1}%",
            plan.duplicate_records as f64 / plan.total_records as f64 * 100.0
        );
    }

    if !plan.samples.is_empty() {
        println!("\nsample duplicate groups:");
        for (i, group) in plan.samples.iter().enumerate() {
            println!("  [{}] {} ({} members)", i + 1, group.fingerprint, group.members.len());
            for member in &group.members {
                println!(
                    "    {} [score {}] {} | {} | {} | {}",
                    if member.keeper { "keep  " } else { "delete" },
                    member.quality_score,
                    truncate(&member.title, 60),
                    member.brand,
                    member
                        .price
                        .map(|p| format!("${p:.2}"))
                        .unwrap_or_else(|| "no price".into()),
                    member.affiliate_network.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    if !plan.deleted_by_brand.is_empty() {
        println!("\ndeletions by brand:");
        for (brand, n) in &plan.deleted_by_brand {
            println!("  {n:>8}  {brand}");
        }
        println!("\ndeletions by network:");
        for (network, n) in &plan.deleted_by_network {
            println!("  {n:>8}  {network}");
        }
    }

    println!("\nsummary");
    println!("  mode:           {}", if summary.live { "LIVE" } else { "DRY RUN" });
    println!("  planned:        {}", summary.planned);
    println!("  deleted:        {}", summary.deleted);
    println!("  failed batches: {}", summary.failed_batches);
    println!("  remaining:      {}", summary.remaining);
    if !summary.live && summary.planned > 0 {
        println!("\ndry run: no changes made; re-run with --live to delete duplicates");
    }
    if summary.failed_batches > 0 {
        warn!(
            failed_batches = summary.failed_batches,
            "some batches failed; re-run the pass to pick up stragglers"
        );
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

fn resolve_database_url(db_url: Option<String>) -> Result<String> {
    if let Some(url) = db_url {
        let trimmed = url.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let env_url = env_util::db_url().with_context(|| "resolve_database_url: missing database URL")?;
    let trimmed = env_url.trim();
    if trimmed.is_empty() {
        bail!("database URL is empty; set DATABASE_URL / SUPABASE_DB_URL or pass --db-url");
    }
    Ok(trimmed.to_string())
}

fn redact_postgres_url(raw: &str) -> String {
    // Best-effort redaction for DSNs so we don't leak credentials into logs.
    // Preserve the host/port/db because they're useful for debugging.
    match url::Url::parse(raw.trim()) {
        Ok(mut u) => {
            let scheme = u.scheme().to_ascii_lowercase();
            if scheme == "postgres" || scheme == "postgresql" {
                let _ = u.set_username("***");
                let _ = u.set_password(Some("***"));
            }
            u.to_string()
        }
        Err(_) => {
            if raw.starts_with("postgres://") || raw.starts_with("postgresql://") {
                if let Some(proto) = raw.find("//") {
                    if let Some(at) = raw[proto + 2..].find('@') {
                        let host_part = &raw[proto + 2 + at + 1..];
                        return format!("{}***:{}", &raw[..proto + 2], host_part);
                    }
                }
                return "postgres://***".to_string();
            }
            raw.to_string()
        }
    }
}
