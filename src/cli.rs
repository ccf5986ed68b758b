use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::filter::Filter;
use crate::models::{TagData, Task};
use crate::time::{print_timestamp, Clock};

#[derive(Parser)]
#[command(name = "tasks")]
#[command(about = "Tasks with saved filters and tags")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Pretend the current time is this many milliseconds since the epoch
    #[arg(long, value_name = "MILLIS")]
    pub now: Option<i64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks in a filter (the configured default if none is given)
    List {
        /// Show tasks carrying this tag
        #[arg(long, conflicts_with = "recent")]
        tag: Option<String>,
        /// Show recently modified tasks
        #[arg(long)]
        recent: bool,
    },
    /// Add a task inside a filter, taking that filter's defaults
    Add {
        /// Task title
        title: String,
        /// Add inside this tag's list
        #[arg(long)]
        tag: Option<String>,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagCommand,
    },
    /// Print a timestamp the way logs render it
    Time {
        /// Milliseconds since the epoch (defaults to now)
        millis: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum TagCommand {
    /// Create a tag
    Add {
        name: String,
        #[arg(long)]
        color: Option<i32>,
        #[arg(long)]
        icon: Option<i32>,
        /// Manual sort position
        #[arg(long)]
        order: Option<i32>,
    },
    /// List tags
    List,
    /// Delete a tag and detach it from its tasks
    Rm { name: String },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Tag not found: {0}")]
    TagNotFound(String),
    #[error("Tag already exists: {0}")]
    TagExists(String),
}

/// Pick the filter a command operates in
pub fn resolve_filter(
    db: &Database,
    config: &Config,
    tag: Option<&str>,
    recent: bool,
) -> Result<Filter, CliError> {
    if let Some(name) = tag {
        let tag = db
            .get_tag_data_by_name(name)?
            .ok_or_else(|| CliError::TagNotFound(name.to_string()))?;
        return Ok(Filter::tag(tag));
    }
    if recent {
        return Ok(Filter::recent("Recently modified"));
    }
    Ok(config.default_filter.to_filter())
}

fn format_task(task: &Task) -> String {
    let due = if task.has_due_date() {
        print_timestamp(task.due_date)
    } else {
        "-".to_string()
    };
    format!("{:>5}  {}  (due {})", task.id.unwrap_or_default(), task.title, due)
}

/// Handle the list command
pub fn handle_list(filter: &Filter, db: &Database, clock: &Clock) -> Result<(), CliError> {
    let tasks = db.query_tasks(filter, clock)?;
    println!("{} ({})", filter, tasks.len());
    for task in &tasks {
        println!("{}", format_task(task));
    }
    Ok(())
}

/// Handle the add command
pub fn handle_add(filter: &Filter, title: String, db: &Database, clock: &Clock) -> Result<(), CliError> {
    let task = db.create_task_in_filter(filter, title, clock)?;
    println!("Task created successfully in {}:", filter);
    println!("{}", format_task(&task));
    Ok(())
}

/// Handle the tag subcommands
pub fn handle_tag(action: TagCommand, db: &Database) -> Result<(), CliError> {
    match action {
        TagCommand::Add { name, color, icon, order } => {
            if db.get_tag_data_by_name(&name)?.is_some() {
                return Err(CliError::TagExists(name));
            }
            let mut tag = TagData::new(name);
            if let Some(color) = color {
                tag = tag.with_color(color);
            }
            if let Some(icon) = icon {
                tag = tag.with_icon(Some(icon));
            }
            if let Some(order) = order {
                tag = tag.with_order(order);
            }
            let saved = db.insert_tag_data(&tag)?;
            println!(
                "Tag created successfully (ID: {}, UUID: {})",
                saved.id.unwrap_or_default(),
                saved.remote_id.as_deref().unwrap_or("")
            );
        }
        TagCommand::List => {
            for tag in db.get_all_tag_data()? {
                println!(
                    "{:>5}  {}  color={} icon={}",
                    tag.id.unwrap_or_default(),
                    tag.display_name(),
                    tag.color.unwrap_or_default(),
                    tag.icon()
                );
            }
        }
        TagCommand::Rm { name } => {
            let tag = db
                .get_tag_data_by_name(&name)?
                .ok_or_else(|| CliError::TagNotFound(name.clone()))?;
            db.delete_tag_data(&tag)?;
            println!("Tag deleted: {}", name);
        }
    }
    Ok(())
}

/// Handle the time command
pub fn handle_time(millis: Option<i64>, clock: &Clock) {
    let millis = millis.unwrap_or_else(|| clock.now());
    println!("{}", print_timestamp(millis));
}
