use clap::{Parser, Subcommand};

const VERSION: &str = env!("GIT_VERSION");

#[derive(Parser)]
#[command(
    name = "tasksync",
    version = VERSION,
    about = "Task checklist with a live-updating board",
    after_help = "\
NOTE:
  The board lives at <root>/.tasksync/board.json, found by walking up
  from the current directory. Run `tasksync init` before any other
  command. `tasksync watch` follows the board live and reprints it when
  another process writes the file.

EXIT CODES:
  0  Success
  1  Error (validation, missing record, storage)

BEHAVIOR NOTES:
  Task and category references accept a unique id prefix; categories
  also resolve by exact title.
  `task move` copies the task into the destination before removing it
  from the source. If interrupted between the two steps the task shows
  up in both categories (duplicated, never lost); delete one copy to
  resolve it. The moved task gets a fresh id and lands at the end of
  the destination category.
  `category delete` removes the category and all of its tasks in one
  atomic batch.
  `category reorder` must list every category; positions are
  re-assigned 0..n in the given order."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Board owner id
    #[arg(long, global = true, default_value = "local")]
    pub user: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a board in this directory
    Init {
        /// Also seed the sample project checklist
        #[arg(long)]
        seed: bool,
    },

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Print the whole board
    Show,

    /// Print every comment across the board, newest first
    Comments,

    /// Follow the board live, reprinting it on every change
    Watch {
        /// Poll interval for external changes, in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category at the end of the board
    Add {
        /// Category title
        title: String,
    },
    /// Rename a category
    Rename {
        /// Category id, id prefix, or title
        reference: String,
        /// New title
        title: String,
    },
    /// Delete a category and all of its tasks
    Delete {
        reference: String,
    },
    /// Put the categories in the given order
    Reorder {
        /// Every category, in the new order
        references: Vec<String>,
    },
    /// List categories
    List,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a category
    Add {
        /// Category id, id prefix, or title
        category: String,
        /// Task name
        name: String,
        /// Due date, e.g. 07/14/24
        #[arg(long, default_value = "")]
        due: String,
        /// Assignee name
        #[arg(long, default_value = "")]
        assignee: String,
        /// Assignee avatar
        #[arg(long, default_value = "👤")]
        avatar: String,
        #[arg(long)]
        description: Option<String>,
        /// low | medium | high
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show task details and comments
    Show {
        /// Task id or prefix
        id: String,
    },
    /// Edit task fields
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// low | medium | high
        #[arg(long)]
        priority: Option<String>,
    },
    /// Set task status (not-started | in-progress | completed)
    Status {
        id: String,
        status: String,
    },
    /// Check a task off
    Done {
        id: String,
    },
    /// Uncheck a task
    Undone {
        id: String,
    },
    /// Duplicate a task within its category
    Duplicate {
        id: String,
    },
    /// Move a task to another category
    Move {
        id: String,
        /// Destination category reference
        #[arg(long)]
        to: String,
    },
    /// Delete a task
    Delete {
        id: String,
    },
    /// Comment on a task
    Comment {
        id: String,
        text: String,
        #[arg(long, default_value = "You")]
        author: String,
        #[arg(long, default_value = "👤")]
        avatar: String,
    },
}
