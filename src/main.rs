//! traveler-admin - maintenance commands for the traveler store

use bson::oid::ObjectId;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use traveler::{
    access::Principal,
    config::Args,
    db::{MongoClient, MongoStore},
    logging,
    model::DocKind,
    progress::WorkManager,
    share::reconcile_backrefs,
    store::DocumentStore,
};

#[derive(Parser, Debug)]
#[command(name = "traveler-admin")]
#[command(about = "Maintenance commands for the traveler store")]
struct Cli {
    #[command(flatten)]
    args: Args,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute a binder's work progress and totals
    RefreshBinder {
        /// Binder id
        id: String,
    },
    /// Rebuild user and group back-references from document share lists
    ReconcileBackrefs,
    /// Print the effective configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let args = cli.args;

    logging::init(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if let Command::CheckConfig = cli.command {
        let directory = args.directory_config()?;
        info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
        info!("CAS: {}", args.sso_config().cas_url);
        info!("Group prefix: {}", directory.group_prefix);
        info!("Group aliases: {}", directory.group_aliases.len());
        info!("API users configured: {}", !args.api_users()?.is_empty());
        return Ok(());
    }

    let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    info!("MongoDB connected: {}", mongo.db_name());
    let store = Arc::new(MongoStore::new(&mongo).await?);

    match cli.command {
        Command::RefreshBinder { id } => {
            let id = ObjectId::parse_str(&id)
                .map_err(|e| anyhow::anyhow!("invalid binder id {}: {}", id, e))?;
            let doc = store
                .load(DocKind::Binder, &id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("binder {} not found", id))?;
            let mut binder = doc
                .into_binder()
                .ok_or_else(|| anyhow::anyhow!("{} is not a binder", id))?;

            // Act as the owner so read access always holds
            let owner = Principal::new(binder.acl.effective_owner());
            let works = WorkManager::new(store.clone());
            let views = works.refresh_works(&mut binder, &owner).await?;
            info!(
                "Binder {}: {} works, value {}/{} finished, {} in progress",
                binder.id,
                views.len(),
                binder.finished_value,
                binder.total_value,
                binder.in_progress_value
            );
        }
        Command::ReconcileBackrefs => {
            let report = reconcile_backrefs(store.as_ref(), store.as_ref()).await?;
            info!(
                "Reconciled: {} added, {} pulled, {} unknown principals",
                report.added, report.pulled, report.missing
            );
        }
        Command::CheckConfig => {}
    }

    Ok(())
}
