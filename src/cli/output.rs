//! CLI output formatting

use crate::build::{Composition, TaskDeclaration};
use crate::core::state::{RunStatus, TaskState};
use crate::execution::ExecutionEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over `total` tasks
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a task state for display
pub fn format_task_state(state: &TaskState) -> String {
    match state {
        TaskState::Pending => style("PENDING").dim().to_string(),
        TaskState::Running { .. } => style("RUNNING").yellow().to_string(),
        TaskState::Completed { .. } => style("COMPLETED").green().to_string(),
        TaskState::Failed { .. } => style("FAILED").red().to_string(),
    }
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            execution_id,
            target,
            planned,
        } => format!(
            "{} Running {} ({} tasks, {})",
            ROCKET,
            style(target).bold(),
            planned,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::TaskStarted { task_id, kind } => {
            format!("{} {} {}", SPINNER, style(task_id).cyan(), style(kind).dim())
        }
        ExecutionEvent::TaskCompleted { task_id, duration } => format!(
            "{} {} {}",
            CHECK,
            style(task_id).green(),
            style(format_duration(*duration)).dim()
        ),
        ExecutionEvent::TaskFailed { task_id, error } => {
            format!("{} {}: {}", CROSS, style(task_id).red(), style(error).dim())
        }
        ExecutionEvent::RunCompleted {
            execution_id,
            status,
        } => format!(
            "{} Run ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// Format a task declaration as one line of `tasks` output
pub fn format_declaration(decl: &TaskDeclaration) -> String {
    let kind = match decl.composition {
        Composition::Leaf => String::new(),
        Composition::Sequence(members) if members.is_empty() => " [umbrella]".to_string(),
        Composition::Sequence(members) => format!(" [sequence: {}]", members.join(", ")),
        Composition::Parallel(members) => format!(" [parallel: {}]", members.join(", ")),
    };
    let deps = if decl.dependencies.is_empty() {
        String::new()
    } else {
        format!(" <- {}", decl.dependencies.join(", "))
    };
    format!(
        "{:<24}{}{}  {}",
        style(decl.id).bold(),
        style(kind).cyan(),
        style(deps).dim(),
        decl.description
    )
}

/// Format a dry-run plan as numbered lines
pub fn format_plan(plan: &[String]) -> String {
    plan.iter()
        .enumerate()
        .map(|(i, id)| format!("  {:>2}. {}", i + 1, id))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
