use std::{
    collections::HashMap,
    io::{self, BufRead, Write},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use client_core::{
    view::render_list, DeleteConfirmation, HttpTodoRemote, ItemEditor, ListController, NewTodo,
    Outcome, DEFAULT_API_BASE_URL,
};
use shared::domain::{Todo, TodoId};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Manage todos on a remote todo service")]
struct Args {
    /// Base url of the todo API.
    #[arg(long, env = "TODO_API_URL", default_value = DEFAULT_API_BASE_URL)]
    server_url: String,
    #[arg(long, env = "TODO_API_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show all todos (the default).
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Toggle {
        id: i64,
    },
    /// Delete a todo after confirming on stdin.
    Delete {
        id: i64,
    },
}

struct StdinConfirmation;

#[async_trait]
impl DeleteConfirmation for StdinConfirmation {
    async fn confirm_delete(&self, todo: &Todo) -> bool {
        let title = todo.title.clone();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(
                stdout,
                "Are you sure you want to delete this todo? \"{title}\" [y/N] "
            )?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(Err(error)) => {
                tracing::warn!(%error, "failed to read delete confirmation");
                false
            }
            Err(error) => {
                tracing::warn!(%error, "delete confirmation task failed");
                false
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let remote = HttpTodoRemote::with_timeout(
        &args.server_url,
        args.timeout_secs.map(Duration::from_secs),
    )?;
    let controller = ListController::new(Arc::new(remote), Arc::new(StdinConfirmation));
    controller.load().await;

    let outcome = match args.command.unwrap_or(Command::List) {
        Command::List => Outcome::Applied,
        Command::Add { title, description } => {
            let input = NewTodo { title, description };
            controller.create(input).await
        }
        Command::Edit {
            id,
            title,
            description,
        } => {
            let mut editor = ItemEditor::new(TodoId(id));
            edit(&mut editor, &controller, title, description).await
        }
        Command::Toggle { id } => ItemEditor::new(TodoId(id)).toggle(&controller).await,
        Command::Delete { id } => ItemEditor::new(TodoId(id)).delete(&controller).await,
    };

    match outcome {
        Outcome::Vanished => eprintln!("No such todo."),
        Outcome::Refused => eprintln!("Title must not be empty."),
        Outcome::Declined => eprintln!("Delete cancelled."),
        Outcome::Applied | Outcome::Failed => {}
    }

    let snapshot = controller.snapshot().await;
    println!("{}", render_list(&snapshot, &HashMap::new()));

    Ok(if snapshot.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn edit(
    editor: &mut ItemEditor,
    controller: &ListController,
    title: Option<String>,
    description: Option<String>,
) -> Outcome {
    let Some(todo) = controller.get(editor.todo_id()).await else {
        return Outcome::Vanished;
    };
    editor.begin_edit(&todo);
    if let Some(title) = title {
        editor.set_title(title);
    }
    if let Some(description) = description {
        editor.set_description(description);
    }
    editor.save(controller).await
}
