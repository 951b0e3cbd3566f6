use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use uuid::Uuid;

use sk_portal_core::{
    progress_percent, transition_table, QuotaCount, QuotaSummary, RequestId, RequestStatus, Role,
};
use sk_portal_server::dashboard::{DashboardSummary, RequestFilter};
use sk_portal_server::repository::{PortalRepository, SqliteRepository};

/// SK portal operator tool
#[derive(Parser, Debug)]
#[command(name = "sk-portal")]
#[command(about = "Inspect SK portal rules and state", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the approval transition table
    Transitions(TransitionsArgs),
    /// Evaluate the 30% female representation rule
    Quota(QuotaArgs),
    /// List requests in a state database
    List(ListArgs),
    /// Show one request with its roster and history
    Show(ShowArgs),
    /// Count requests per status
    Counts(DbArgs),
}

#[derive(Parser, Debug)]
struct TransitionsArgs {
    /// Only show rows for this role (e.g. verifier)
    #[arg(long)]
    role: Option<String>,
}

#[derive(Parser, Debug)]
struct QuotaArgs {
    /// Number of female officers
    #[arg(long)]
    female: u32,

    /// Total number of officers
    #[arg(long)]
    total: u32,
}

#[derive(Parser, Debug)]
struct DbArgs {
    /// Path to the state database
    #[arg(long, env = "SK_PORTAL_DB", default_value = "sk-portal.db")]
    db: PathBuf,
}

#[derive(Parser, Debug)]
struct ListArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Only requests in this status (e.g. submitted)
    #[arg(long)]
    status: Option<String>,

    /// Only requests from this region
    #[arg(long)]
    region: Option<String>,

    /// Search chapter name, region and meeting location
    #[arg(short, long)]
    query: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Request id
    id: Uuid,
}

fn run_transitions(args: TransitionsArgs) -> Result<()> {
    let role = args
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()?;

    println!("{:<16} {:<24} {:<8} {:<24}", "ROLE", "FROM", "DECISION", "TO");
    for rule in transition_table() {
        if role.is_some_and(|r| r != rule.role) {
            continue;
        }
        println!(
            "{:<16} {:<24} {:<8} {:<24}",
            rule.role.as_str(),
            rule.from.as_str(),
            rule.decision.as_str(),
            rule.to.as_str()
        );
    }
    Ok(())
}

fn run_quota(args: QuotaArgs) -> Result<()> {
    if args.female > args.total {
        return Err(anyhow!(
            "female count {} exceeds total {}",
            args.female,
            args.total
        ));
    }
    let count = QuotaCount {
        female: args.female,
        total: args.total,
    };
    println!("female:     {} of {}", count.female, count.total);
    println!("percentage: {:.1}%", count.percentage());
    if count.is_met() {
        println!("quota:      met");
    } else {
        println!(
            "quota:      not met, add {} more female officer(s)",
            count.shortfall()
        );
    }
    Ok(())
}

fn open_repository(path: &Path) -> Result<SqliteRepository> {
    if !path.exists() {
        return Err(anyhow!("state database {} does not exist", path.display()));
    }
    debug!("Opening state database read-only: {}", path.display());
    SqliteRepository::open_read_only(path)
        .with_context(|| format!("Failed to open state database {}", path.display()))
}

async fn run_list(args: ListArgs) -> Result<()> {
    let repo = open_repository(&args.db.db)?;
    let filter = RequestFilter {
        status: args
            .status
            .as_deref()
            .map(str::parse::<RequestStatus>)
            .transpose()?,
        region: args.region,
        q: args.query,
    };
    let listings = repo.list_requests().await?;
    let summary = DashboardSummary::from_listings(&listings);
    let matching: Vec<_> = listings.into_iter().filter(|l| filter.matches(l)).collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "summary": summary,
                "requests": matching,
            }))?
        );
        return Ok(());
    }

    println!(
        "{:<36} {:<24} {:<20} {:<22} {:>7}",
        "ID", "CHAPTER", "REGION", "STATUS", "VERSION"
    );
    for listing in &matching {
        println!(
            "{:<36} {:<24} {:<20} {:<22} {:>7}",
            listing.request.id,
            listing.chapter_name,
            listing.region.as_deref().unwrap_or("-"),
            listing.request.status.as_str(),
            listing.request.version
        );
    }
    println!(
        "\n{} shown; {} total, {} awaiting verification, {} in progress, {} completed",
        matching.len(),
        summary.total,
        summary.awaiting_verification,
        summary.in_progress,
        summary.completed
    );
    Ok(())
}

async fn run_show(args: ShowArgs) -> Result<()> {
    let repo = open_repository(&args.db.db)?;
    let id = RequestId(args.id);
    let request = repo
        .get_request(id)
        .await?
        .ok_or_else(|| anyhow!("request {} not found", id))?;
    let chapter = repo.get_profile(request.chapter_id).await?;
    let officers = repo.officers(id).await?;
    let history = repo.history(id).await?;

    let output = json!({
        "chapter": chapter,
        "progress_percent": progress_percent(request.status),
        "quota": QuotaSummary::of(&officers),
        "request": request,
        "officers": officers,
        "history": history,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_counts(args: DbArgs) -> Result<()> {
    let repo = open_repository(&args.db)?;
    let counts = repo.status_counts().await?;
    if counts.is_empty() {
        println!("no requests");
        return Ok(());
    }
    for (status, count) in counts {
        println!("{:<24} {}", status.as_str(), count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transitions(args) => run_transitions(args),
        Commands::Quota(args) => run_quota(args),
        Commands::List(args) => run_list(args).await,
        Commands::Show(args) => run_show(args).await,
        Commands::Counts(args) => run_counts(args).await,
    }
}
