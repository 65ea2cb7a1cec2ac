//! Operational CLI for the activity aggregator: migrations, database
//! bootstrap, and on-demand sync against a local `ServerInfra` for
//! operators who don't want to go through the HTTP API.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use common::Config;
use domain::repositories::{AccountRepository, ProfileRepository, RateLimitRepository};
use domain::services::scheduler::{refresh_all, SchedulerDeps};
use infra::{InfraAccountSync, InfraTimelineRegenerator, ServerInfra};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "aggregator-cli", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Initialize the database and report schema/migration state
    DbInit,
    /// Trigger an on-demand sync for one user, or every user with --all
    Sync {
        /// User id to sync. Omit and pass --all to sync every user.
        user_id: Option<Uuid>,
        #[arg(long)]
        all: bool,
    },
}

async fn build_scheduler_deps(infra: Arc<ServerInfra>) -> SchedulerDeps {
    SchedulerDeps {
        account_repo: Arc::new(infra.db.clone()) as Arc<dyn AccountRepository>,
        profile_repo: Arc::new(infra.db.clone()) as Arc<dyn ProfileRepository>,
        rate_limit_repo: Arc::new(infra.db.clone()) as Arc<dyn RateLimitRepository>,
        account_sync: Arc::new(InfraAccountSync::new(infra.clone())),
        timeline_regenerator: Arc::new(InfraTimelineRegenerator::new(infra.clone())),
    }
}

async fn run_migrate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = infra::db::init_db(&config.database_url).await?;
    pool.close().await;
    println!("migrations applied");
    Ok(())
}

async fn run_db_init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("database url: {}", config.database_url);
    let pool = infra::db::init_db(&config.database_url).await?;

    let tables = infra::db::list_tables(&pool).await?;
    println!("tables:");
    for table in tables {
        println!("  - {table}");
    }

    let migrations = infra::db::list_migrations(&pool).await?;
    println!("applied migrations:");
    for (version, description) in migrations {
        println!("  - {version} {description}");
    }

    pool.close().await;
    Ok(())
}

async fn run_sync(config: &Config, user_id: Option<Uuid>, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let infra = Arc::new(ServerInfra::new(config).await?);
    let deps = Arc::new(build_scheduler_deps(infra.clone()).await);

    if all {
        let accounts = AccountRepository::find_all_active(&infra.db).await?;
        let mut by_user: std::collections::HashMap<Uuid, Vec<domain::models::account::Account>> = std::collections::HashMap::new();
        for account in accounts {
            let Some(profile) = ProfileRepository::find_by_id(&infra.db, account.profile_id).await? else {
                continue;
            };
            by_user.entry(profile.owner_user_id).or_default().push(account);
        }

        let now = chrono::Utc::now();
        for (user_id, accounts) in by_user {
            let summary = refresh_all(deps.clone(), user_id, accounts, now).await;
            println!(
                "user {user_id}: processed={} updated={} failed={} timelines={}",
                summary.processed, summary.updated_users, summary.failed_accounts, summary.timelines_generated
            );
        }
        return Ok(());
    }

    let Some(user_id) = user_id else {
        return Err("either a user id or --all is required".into());
    };

    let profiles = ProfileRepository::find_by_owner(&infra.db, user_id).await?;
    let mut accounts = Vec::new();
    for profile in profiles {
        accounts.extend(AccountRepository::find_by_profile(&infra.db, profile.id).await?);
    }

    let now = chrono::Utc::now();
    let summary = refresh_all(deps, user_id, accounts, now).await;
    println!(
        "user {user_id}: processed={} updated={} failed={} timelines={}",
        summary.processed, summary.updated_users, summary.failed_accounts, summary.timelines_generated
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Migrate => run_migrate(&config).await,
        Commands::DbInit => run_db_init(&config).await,
        Commands::Sync { user_id, all } => run_sync(&config, user_id, all).await,
    }
}
