use anyhow::{Context, Result};
use pstasks::build::{BuildSession, SessionOptions, CANONICAL_TASKS};
use pstasks::cli::commands::{ConfigCommand, RunCommand, TasksCommand};
use pstasks::cli::output::*;
use pstasks::cli::{Cli, Command};
use pstasks::collaborators::Collaborators;
use pstasks::core::config::ConfigResolver;
use pstasks::execution::ExecutionEvent;
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    let cwd = std::env::current_dir().context("Failed to read working directory")?;

    match &cli.command {
        Command::Run(cmd) => run_task(cmd, &cli, &cwd).await?,
        Command::Tasks(cmd) => list_tasks(cmd)?,
        Command::Config(cmd) => show_config(cmd, &cli, &cwd)?,
    }

    Ok(())
}

fn prepare_session(cli: &Cli, cwd: &Path) -> Result<BuildSession> {
    let options: SessionOptions = cli.session_options(cwd);
    let resolver = ConfigResolver::from_env(options.layout.root());
    let collaborators = Collaborators::system(options.layout.root());
    let session = BuildSession::prepare(&resolver, options, collaborators)?;
    Ok(session)
}

async fn run_task(cmd: &RunCommand, cli: &Cli, cwd: &Path) -> Result<()> {
    let session = prepare_session(cli, cwd)?;
    let plan = session.plan(&cmd.task)?;

    println!(
        "{} Environment {} (config from {})",
        INFO,
        style(&session.environment().name).bold(),
        style(&session.config().source).dim()
    );

    if cmd.dry_run {
        println!("{} Planned order for {}:", INFO, style(&cmd.task).bold());
        println!("{}", format_plan(&plan));
        return Ok(());
    }

    let progress = create_progress_bar(plan.len());
    let bar = progress.clone();
    let engine = session.engine().with_event_handler(move |event| {
        if matches!(
            event,
            ExecutionEvent::TaskCompleted { .. } | ExecutionEvent::TaskFailed { .. }
        ) {
            bar.inc(1);
        }
        bar.println(format_execution_event(&event));
    });

    println!();
    let report = engine.execute(&cmd.task).await;
    progress.finish_and_clear();

    match &report.error {
        None => {
            println!(
                "\n{} {} completed {} ({} tasks)",
                CHECK,
                style(&cmd.task).bold(),
                style("successfully").green(),
                report.state.completed_count()
            );
            Ok(())
        }
        Some(err) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&cmd.task).bold(),
                style("failed").red()
            );
            for task_id in err.failing_tasks() {
                println!("  {} {}", CROSS, style(task_id).red());
            }
            error!("{}", err);
            std::process::exit(1);
        }
    }
}

fn list_tasks(cmd: &TasksCommand) -> Result<()> {
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(CANONICAL_TASKS)?);
        return Ok(());
    }

    println!("{} Available tasks:", INFO);
    for decl in CANONICAL_TASKS {
        println!("  {}", format_declaration(decl));
    }
    Ok(())
}

fn show_config(cmd: &ConfigCommand, cli: &Cli, cwd: &Path) -> Result<()> {
    let session = prepare_session(cli, cwd)?;
    let env = session.environment();
    let substitutions = session.substitution_context();

    if cmd.json {
        let data = serde_json::json!({
            "source": session.config().source.to_string(),
            "path": session.config().source.path(),
            "environment": env.name,
            "resolved": env.is_resolved(),
            "substitutions": substitutions,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Config: {}", INFO, style(&session.config().source).bold());
    println!("  Environment: {}", style(&env.name).cyan());
    match substitutions {
        Some(context) => {
            println!("  Substitutions:");
            for key in context.keys() {
                println!(
                    "    {} = {}",
                    style(key).cyan(),
                    style(context.get(key).unwrap_or_default()).dim()
                );
            }
        }
        None => println!(
            "  {} not configured; deploy and preprocess stages will be skipped",
            WARN
        ),
    }
    Ok(())
}
