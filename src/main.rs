use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use serde::Serialize;
use tokio::sync::watch;

use study_hub_lib::backend::{Backend, LocalBackend, RemoteBackend};
use study_hub_lib::classifier::classify;
use study_hub_lib::cli::{Cli, Commands};
use study_hub_lib::commands::{self, AppCtx, CommandCtx, CommandResult, Hub, TaskPatch};
use study_hub_lib::config::AppConfig;
use study_hub_lib::logging::init_logging;
use study_hub_lib::models::{NewTask, PomodoroSettings, TaskStatus, UserProgress, Weekday};
use study_hub_lib::notify::Notifier;
use study_hub_lib::pomodoro::{PhaseEvent, PomodoroSession};
use study_hub_lib::storage::Storage;

#[derive(Serialize)]
struct FocusReport {
    completed: Vec<PhaseEvent>,
    cancelled: bool,
    sessions: u32,
    progress: Option<UserProgress>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Commands::ConfigPath = cli.command {
        return print_config_path();
    }

    let config = AppConfig::load()?;
    let data_dir = config.data_dir()?;
    init_logging(&data_dir).context("failed to start logger")?;

    let storage = Storage::new(data_dir);
    storage.ensure_dirs()?;
    let backend: Arc<dyn Backend> = match config.api_base() {
        Some(base) => {
            log::info!("using remote backend base={base}");
            Arc::new(RemoteBackend::new(base)?)
        }
        None => Arc::new(LocalBackend::new(storage.clone())),
    };
    let notifier = Notifier::new(config.notify_base().map(str::to_string));
    let ctx = AppCtx::new(storage, notifier);
    let hub = Hub::new(backend);

    let succeeded = run(cli.command, &ctx, &hub).await?;
    ctx.notifier().flush().await;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn print_config_path() -> Result<()> {
    let path = AppConfig::config_path()?;
    if !path.exists() {
        AppConfig::default().save_to(&path)?;
    }
    println!("{}", path.display());
    Ok(())
}

fn emit<T: Serialize>(result: CommandResult<T>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.ok)
}

async fn run(command: Commands, ctx: &AppCtx, hub: &Hub) -> Result<bool> {
    match command {
        Commands::Tasks { day: Some(day) } => emit(commands::day_tasks_impl(hub, day).await),
        Commands::Tasks { day: None } => emit(commands::list_tasks_impl(hub).await),
        Commands::Today => {
            let today = Weekday::from(ctx.now().weekday());
            emit(commands::day_tasks_impl(hub, today).await)
        }
        Commands::Add {
            title,
            day,
            start,
            end,
            description,
            category,
        } => {
            let task = NewTask {
                category: category.unwrap_or_else(|| classify(&title)),
                time_slot: format!("{start} - {end}"),
                title,
                description,
                start_time: start,
                end_time: end,
                day,
                status: TaskStatus::Pending,
            };
            emit(commands::add_task_impl(hub, task).await)
        }
        Commands::Edit {
            id,
            title,
            description,
            day,
            start,
            end,
            category,
        } => {
            let patch = TaskPatch {
                title,
                description,
                day,
                start_time: start,
                end_time: end,
                category,
            };
            emit(commands::edit_task_impl(hub, id, patch).await)
        }
        Commands::Status { id, status } => {
            emit(commands::change_status_impl(ctx, hub, id, status).await)
        }
        Commands::Cycle { id } => emit(commands::cycle_status_impl(ctx, hub, id).await),
        Commands::Delete { id } => emit(commands::remove_task_impl(hub, id).await),
        Commands::Import { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            emit(commands::import_csv_impl(hub, &text).await)
        }
        Commands::Progress => emit(commands::load_progress_impl(hub).await),
        Commands::XpLog => emit(commands::xp_log_impl(hub).await),
        Commands::Dashboard => emit(commands::dashboard_impl(ctx, hub).await),
        Commands::Focus { phases } => focus(ctx, hub, phases).await,
        Commands::Pomodoro {
            focus,
            short_break,
            long_break,
            sessions,
        } => {
            let current = commands::load_pomodoro_settings_impl(ctx);
            if focus.is_none() && short_break.is_none() && long_break.is_none() && sessions.is_none()
            {
                return emit(current);
            }
            let base = current.data.unwrap_or_default();
            let settings = PomodoroSettings {
                focus_duration: focus.unwrap_or(base.focus_duration),
                break_duration: short_break.unwrap_or(base.break_duration),
                long_break_duration: long_break.unwrap_or(base.long_break_duration),
                sessions_before_long_break: sessions.unwrap_or(base.sessions_before_long_break),
            };
            emit(commands::save_pomodoro_settings_impl(ctx, settings))
        }
        Commands::Summary => emit(commands::daily_summary_impl(ctx, hub).await),
        Commands::Backups => emit(commands::list_backups_impl(ctx)),
        Commands::Restore { name } => emit(commands::restore_backup_impl(ctx, hub, name).await),
        Commands::ConfigPath => print_config_path().map(|()| true),
    }
}

/// Runs `phases` Pomodoro phases back to back; Ctrl-C stops the current one.
async fn focus(ctx: &AppCtx, hub: &Hub, phases: u32) -> Result<bool> {
    let settings = commands::load_pomodoro_settings_impl(ctx)
        .data
        .unwrap_or_default();
    let mut session = PomodoroSession::new(settings, hub.progress.clone());

    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let mut report = FocusReport {
        completed: Vec::new(),
        cancelled: false,
        sessions: 0,
        progress: None,
    };
    for _ in 0..phases {
        eprintln!(
            "{:?} {}",
            session.timer().phase(),
            session.timer().format_remaining()
        );
        let outcome = session
            .run_phase(&mut cancel_rx, |timer| {
                eprint!(
                    "\r{} {:>5.1}%",
                    timer.format_remaining(),
                    timer.progress_percent()
                );
            })
            .await;
        eprintln!();
        match outcome {
            Ok(Some(event)) => report.completed.push(event),
            Ok(None) => {
                report.cancelled = true;
                break;
            }
            Err(error) => {
                return emit(commands::err::<FocusReport>(&format!(
                    "storage error: {error}"
                )))
            }
        }
    }

    report.sessions = session.timer().sessions();
    report.progress = commands::load_progress_impl(hub).await.data;
    emit(commands::ok(report))
}
