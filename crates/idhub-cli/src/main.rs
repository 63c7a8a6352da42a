//! idhub — identity hub batch CLI.

mod cli;
mod config;
mod source;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use idhub_core::error::{HubError, HubResult};
use idhub_core::models::source::SourceSystem;
use idhub_db::repository::{
    SurrealAuditLogRepository, SurrealGroupRepository, SurrealOrgUnitRepository,
    SurrealPersonRepository, SurrealTaskRepository,
};
use idhub_db::{DbManager, run_migrations};
use idhub_export::{build_group_map, build_person_feed, group_map, person_feed, write_export};
use idhub_import::importer::{EmployeeImporter, ImportAction, ImportConfig};
use idhub_import::tasks::{QueueOptions, process_queue};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ExportCommand, QueueCommand};
use crate::config::HubConfig;
use crate::source::FileSource;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("idhub=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> HubResult<()> {
    let config = HubConfig::load(cli.config.as_deref())?;
    let manager = DbManager::connect(&config.db)
        .await
        .map_err(|e| HubError::Database(e.to_string()))?;
    let db = manager.client().clone();

    match cli.command {
        Command::Migrate => migrate(&db).await,
        Command::Import { file, source } => import(&db, &config, &file, &source).await,
        Command::Queue(QueueCommand::Stats) => queue_stats(&db).await,
        Command::Queue(QueueCommand::Run { file, limit }) => {
            queue_run(&db, &config, file.as_deref(), limit).await
        }
        Command::Export(ExportCommand::Persons { out }) => {
            let out = out.unwrap_or_else(|| config.export.persons_out.clone());
            export_persons(&db, &out).await
        }
        Command::Export(ExportCommand::Groups { out }) => {
            let out = out.unwrap_or_else(|| config.export.groups_out.clone());
            export_groups(&db, &out).await
        }
    }
}

async fn migrate(db: &Surreal<Client>) -> HubResult<()> {
    run_migrations(db).await.map_err(HubError::from)?;
    info!("migrations applied");
    Ok(())
}

fn build_importer(
    db: &Surreal<Client>,
    config: &HubConfig,
) -> EmployeeImporter<
    SurrealPersonRepository<Client>,
    SurrealOrgUnitRepository<Client>,
    SurrealGroupRepository<Client>,
    SurrealAuditLogRepository<Client>,
    SurrealTaskRepository<Client>,
> {
    EmployeeImporter::new(
        SurrealPersonRepository::new(db.clone()),
        SurrealOrgUnitRepository::new(db.clone()),
        SurrealGroupRepository::new(db.clone()),
        SurrealAuditLogRepository::new(db.clone()),
        SurrealTaskRepository::new(db.clone()),
    )
    .with_config(ImportConfig {
        source: SourceSystem::Hr,
        queue: config.import.queue.clone(),
        reservation_group: config.import.reservation_group.clone(),
        actor: config.import.actor.clone(),
    })
}

async fn import(
    db: &Surreal<Client>,
    config: &HubConfig,
    file: &Path,
    source: &str,
) -> HubResult<()> {
    if source != "hr" {
        return Err(HubError::Validation {
            message: format!("unsupported source system: {source}"),
        });
    }

    let snapshot = FileSource::load(file)?;
    info!(records = snapshot.len(), file = %file.display(), "starting import");

    let importer = build_importer(db, config);
    let mut created = 0u64;
    let mut updated = 0u64;
    let mut removed = 0u64;
    let mut skipped = 0u64;
    let mut deferred = 0u64;
    let mut failed = 0u64;

    for bundle in snapshot.records() {
        match importer.handle_employee(bundle).await {
            Ok(outcome) => {
                match outcome.action {
                    ImportAction::Created => created += 1,
                    ImportAction::Updated => updated += 1,
                    ImportAction::Removed => removed += 1,
                    ImportAction::Skipped => skipped += 1,
                }
                if outcome.deferred_until.is_some() {
                    deferred += 1;
                }
            }
            Err(err) => {
                warn!(
                    hr_id = %bundle.employee.person_id,
                    error = %err,
                    "record failed"
                );
                failed += 1;
            }
        }
    }

    info!(created, updated, removed, skipped, deferred, failed, "import finished");
    if failed > 0 {
        return Err(HubError::Internal(format!("{failed} records failed")));
    }
    Ok(())
}

async fn queue_stats(db: &Surreal<Client>) -> HubResult<()> {
    use idhub_core::repository::TaskRepository;

    let tasks = SurrealTaskRepository::new(db.clone());
    let counts = tasks.queue_counts().await?;
    if counts.is_empty() {
        println!("no queued tasks");
        return Ok(());
    }
    for (queue, total) in counts {
        println!("{queue}\t{total}");
    }
    Ok(())
}

async fn queue_run(
    db: &Surreal<Client>,
    config: &HubConfig,
    file: Option<&Path>,
    limit: Option<usize>,
) -> HubResult<()> {
    let Some(path) = file.or(config.import.snapshot.as_deref()) else {
        return Err(HubError::Validation {
            message: "no source snapshot: pass --file or set import.snapshot".into(),
        });
    };
    let snapshot = FileSource::load(path)?;
    let importer = build_importer(db, config);
    let tasks = SurrealTaskRepository::new(db.clone());
    let options = QueueOptions {
        queue: config.import.queue.clone(),
        max_attempts: config.import.max_attempts,
        retry_delay: chrono::TimeDelta::minutes(config.import.retry_delay_minutes),
        limit,
    };

    let stats = process_queue(&importer, &tasks, &snapshot, &options).await?;
    info!(
        processed = stats.processed,
        failed = stats.failed,
        "queue run finished"
    );
    if stats.failed > 0 {
        return Err(HubError::Internal(format!("{} tasks failed", stats.failed)));
    }
    Ok(())
}

async fn export_persons(db: &Surreal<Client>, out: &Path) -> HubResult<()> {
    let persons = SurrealPersonRepository::new(db.clone());
    let org_units = SurrealOrgUnitRepository::new(db.clone());
    let entries = build_person_feed(&persons, &org_units).await?;
    write_export(out, &person_feed(&entries))?;
    info!(entries = entries.len(), out = %out.display(), "person feed written");
    Ok(())
}

async fn export_groups(db: &Surreal<Client>, out: &Path) -> HubResult<()> {
    let groups = SurrealGroupRepository::new(db.clone());
    let accounts = idhub_db::repository::SurrealAccountRepository::new(db.clone());
    let entries = build_group_map(&groups, &accounts).await?;
    write_export(out, &group_map(&entries))?;
    info!(entries = entries.len(), out = %out.display(), "group map written");
    Ok(())
}
