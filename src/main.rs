use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use std::path::PathBuf;
use todostore::{Backend, Collection, Config, FilterMode, IdGenerator, Store, Task, TaskEdit, Theme, parse_deadline};

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - Keep a task list with deadlines and tags")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: <config dir>/todostore/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory from the config
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks in display order
    List {
        /// all, active or completed
        #[arg(short, long, default_value_t = FilterMode::All)]
        filter: FilterMode,
    },

    /// Add a task to the top of the list
    Add {
        label: String,

        /// Deadline, e.g. 2024-12-01T23:59 or 2024-12-01
        #[arg(short, long, value_parser = parse_deadline)]
        deadline: Option<chrono::DateTime<Utc>>,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Mark a task completed
    Done { id: String },

    /// Mark a task not completed
    Undo { id: String },

    /// Change a task's label, deadline or tags
    Edit {
        id: String,

        #[arg(short, long)]
        label: Option<String>,

        #[arg(short, long, value_parser = parse_deadline, conflicts_with = "clear_deadline")]
        deadline: Option<chrono::DateTime<Utc>>,

        #[arg(long)]
        clear_deadline: bool,

        /// Replace all tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a task
    Rm { id: String },

    /// Move the task at position FROM to position TO (positions as shown by list)
    Mv { from: usize, to: usize },

    /// Show or change the theme: show, toggle, dark or light
    Theme { action: Option<String> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    setup_logging(&config.log_level)?;

    let backend = config.open_backend()?;
    let mut store = Store::open_default(backend);

    match cli.command {
        Commands::List { filter } => {
            print_list(&store.collection(), filter);
        }
        Commands::Add { label, deadline, tags } => {
            let before = store.len();
            let collection = store.add(&label, deadline, tags).context("Failed to add task")?;
            if collection.len() == before {
                println!("Nothing added: label is empty");
            } else {
                println!("Added {}", collection[0].id().bold());
            }
        }
        Commands::Done { id } => {
            let id = resolve_id(&store, &id)?;
            store
                .set_completion(&id, true, TaskEdit::default())
                .context("Failed to update task")?;
            println!("Completed {}", id.bold());
        }
        Commands::Undo { id } => {
            let id = resolve_id(&store, &id)?;
            store
                .set_completion(&id, false, TaskEdit::default())
                .context("Failed to update task")?;
            println!("Reopened {}", id.bold());
        }
        Commands::Edit {
            id,
            label,
            deadline,
            clear_deadline,
            tags,
        } => {
            let id = resolve_id(&store, &id)?;
            let completed = store.get(&id).is_some_and(Task::is_completed);

            let mut edit = TaskEdit {
                label,
                ..TaskEdit::default()
            };
            if let Some(deadline) = deadline {
                edit = edit.deadline(deadline);
            } else if clear_deadline {
                edit = edit.clear_deadline();
            }
            if !tags.is_empty() {
                edit = edit.tags(tags);
            }

            store
                .set_completion(&id, completed, edit)
                .context("Failed to update task")?;
            println!("Updated {}", id.bold());
        }
        Commands::Rm { id } => {
            let id = resolve_id(&store, &id)?;
            store.remove(&id).context("Failed to delete task")?;
            println!("Deleted {}", id.bold());
        }
        Commands::Mv { from, to } => {
            store.reorder(from, to).context("Failed to move task")?;
            println!("Moved {} -> {}", from, to);
        }
        Commands::Theme { action } => {
            let theme = match action.as_deref() {
                None | Some("show") => store.theme(),
                Some("toggle") => store.toggle_theme().context("Failed to save theme")?,
                Some(other) => {
                    let theme: Theme = other.parse()?;
                    store.set_theme(theme).context("Failed to save theme")?
                }
            };
            println!("Theme: {}", theme);
        }
    }

    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .parse()
        .map_err(|_| eyre!("Invalid log level in config: {}", level))?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Exact id, or a trailing fragment (as printed by `list`) that matches exactly one task
fn resolve_id<B: Backend, G: IdGenerator>(store: &Store<B, G>, query: &str) -> Result<String> {
    // An empty fragment would match every id
    if query.trim().is_empty() {
        return Err(eyre!("Task id cannot be empty"));
    }

    if store.get(query).is_some() {
        return Ok(query.to_string());
    }

    let collection = store.collection();
    let matches: Vec<&str> = collection
        .iter()
        .map(|t| t.id())
        .filter(|id| id.ends_with(query))
        .collect();

    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(eyre!("No task matching '{}'", query)),
        _ => Err(eyre!("'{}' matches {} tasks, give more characters", query, matches.len())),
    }
}

fn print_list(collection: &Collection, filter: FilterMode) {
    let now = Utc::now();
    let mut shown = 0;

    for (position, task) in collection.iter().enumerate() {
        if !filter.matches(task) {
            continue;
        }
        shown += 1;

        let check = if task.is_completed() { "[x]" } else { "[ ]" };
        let label = if task.is_completed() {
            task.label().dimmed().strikethrough()
        } else {
            task.label().normal()
        };

        let mut line = format!("{:>3}  {} {}  {}", position, check, label, short_id(task.id()).bright_black());

        if let Some(deadline) = task.deadline() {
            let due = format!("due {}", deadline.format("%Y-%m-%d %H:%M"));
            let due = if task.is_overdue(now) { due.red() } else { due.yellow() };
            line.push_str(&format!("  {}", due));
        }

        for tag in task.tags().iter() {
            line.push_str(&format!("  {}", format!("#{}", tag).cyan()));
        }

        println!("{}", line);
    }

    if shown == 0 {
        println!("No {} tasks", filter);
    }
}

fn short_id(id: &str) -> &str {
    // UUID v7 heads are timestamps and repeat within a session; the random tail does not
    if id.is_ascii() && id.len() > 12 { &id[id.len() - 8..] } else { id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todostore::{MemoryBackend, SequentialIds};

    fn single_task_store() -> Store<MemoryBackend, SequentialIds> {
        let raw = r#"[{"id":"0190b6a2-7c1e-7d3f-9a4b-1c2d3e4f5a6b","label":"Only","checked":false}]"#;
        Store::open(MemoryBackend::new().with_entry("todos", raw), SequentialIds::default())
    }

    #[test]
    fn test_resolve_id_rejects_empty_query() {
        let store = single_task_store();
        assert!(resolve_id(&store, "").is_err());
        assert!(resolve_id(&store, "   ").is_err());
    }

    #[test]
    fn test_resolve_id_exact_and_suffix() {
        let store = single_task_store();
        let full = "0190b6a2-7c1e-7d3f-9a4b-1c2d3e4f5a6b";
        assert_eq!(resolve_id(&store, full).unwrap(), full);
        assert_eq!(resolve_id(&store, "3e4f5a6b").unwrap(), full);
        assert!(resolve_id(&store, "ffff").is_err());
    }

    #[test]
    fn test_resolve_id_ambiguous_suffix() {
        let store = Store::open(MemoryBackend::new(), SequentialIds::default());
        // Exact ids resolve before suffix matching
        assert_eq!(resolve_id(&store, "1").unwrap(), "1");

        let raw = r#"[{"id":"a-12","label":"x","checked":false},{"id":"b-12","label":"y","checked":false}]"#;
        let store = Store::open(MemoryBackend::new().with_entry("todos", raw), SequentialIds::default());
        assert!(resolve_id(&store, "12").is_err());
        assert_eq!(resolve_id(&store, "b-12").unwrap(), "b-12");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0190b6a2-7c1e-7d3f-9a4b-1c2d3e4f5a6b"), "3e4f5a6b");
        assert_eq!(short_id("42"), "42");
    }
}
