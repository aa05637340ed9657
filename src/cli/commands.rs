use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ff", about = concat!("focusflow v", env!("CARGO_PKG_VERSION"), " - tasks, habits and focus for busy brains"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and a commented config.toml
    Init(InitArgs),
    /// Add, list and edit tasks
    Task(TaskCmd),
    /// Manage task categories
    Category(VocabCmd),
    /// Manage task tags
    Tag(VocabCmd),
    /// Add, complete and edit habits
    Habit(HabitCmd),
    /// Record focus sessions
    Focus(FocusCmd),
    /// Run a pomodoro timer in the foreground
    Timer(TimerArgs),
    /// Quick-capture thoughts to sort out later
    Dump(DumpCmd),
    /// Search tasks, habits and the brain dump by regex
    Search(SearchArgs),
    /// Validate data integrity
    Check,
    /// Export calendar-synced habits as an .ics file
    Export(ExportArgs),
    /// Show or edit config.toml
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config.toml with the template
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add(TaskAddArgs),
    /// List tasks (pending only unless --all)
    List(TaskListArgs),
    /// Show task details
    Show(IdArg),
    /// Toggle a task's completion
    Done(IdArg),
    /// Edit task fields
    Edit(TaskEditArgs),
    /// Delete a task
    Rm(IdArg),
    /// Manage subtasks
    Sub(SubCmd),
    /// Add or remove a tag on one task
    Tag(TaskTagCmd),
}

#[derive(Args)]
pub struct IdArg {
    /// ID or unique ID prefix
    pub id: String,
}

#[derive(Args)]
pub struct TaskAddArgs {
    /// Task title
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<String>,
    /// Due date (YYYY-MM-DD, today or tomorrow)
    #[arg(long)]
    pub due: Option<String>,
    /// Estimated minutes
    #[arg(long)]
    pub estimate: Option<i64>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// 1 (trivial) to 5 (hard)
    #[arg(long)]
    pub difficulty: Option<u8>,
    /// Energy needed: low, medium or high
    #[arg(long)]
    pub energy: Option<String>,
    /// Focus needed: low, medium or high
    #[arg(long)]
    pub focus: Option<String>,
    /// Something to look forward to when it's done
    #[arg(long)]
    pub reward: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct TaskListArgs {
    /// Include completed tasks
    #[arg(long)]
    pub all: bool,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<String>,
    /// Only tasks due today
    #[arg(long)]
    pub due_today: bool,
}

/// Optional fields accept `none` to clear them
#[derive(Args)]
pub struct TaskEditArgs {
    /// ID or unique ID prefix
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    /// YYYY-MM-DD, today, tomorrow or none
    #[arg(long)]
    pub due: Option<String>,
    /// Minutes, or none
    #[arg(long)]
    pub estimate: Option<String>,
    /// Minutes actually spent, or none
    #[arg(long)]
    pub actual: Option<String>,
    #[arg(long)]
    pub difficulty: Option<u8>,
    #[arg(long)]
    pub energy: Option<String>,
    #[arg(long)]
    pub focus: Option<String>,
    #[arg(long)]
    pub reward: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct SubCmd {
    #[command(subcommand)]
    pub action: SubAction,
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Append a subtask
    Add { task: String, title: String },
    /// Toggle a subtask
    Done { task: String, sub: String },
    /// Rename a subtask
    Edit {
        task: String,
        sub: String,
        title: String,
    },
    /// Remove a subtask
    Rm { task: String, sub: String },
}

#[derive(Args)]
pub struct TaskTagCmd {
    #[command(subcommand)]
    pub action: TaskTagAction,
}

#[derive(Subcommand)]
pub enum TaskTagAction {
    Add { id: String, tag: String },
    Rm { id: String, tag: String },
}

// ---------------------------------------------------------------------------
// Vocabularies (task categories, task tags, habit categories)
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct VocabCmd {
    #[command(subcommand)]
    pub action: Option<VocabAction>,
}

#[derive(Subcommand)]
pub enum VocabAction {
    /// List entries (default)
    List,
    /// Add an entry
    Add { name: String },
    /// Remove an entry and clear it from every item using it
    Rm { name: String },
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct HabitCmd {
    #[command(subcommand)]
    pub action: HabitAction,
}

#[derive(Subcommand)]
pub enum HabitAction {
    /// Add a habit and tomorrow's task for it
    Add(HabitAddArgs),
    /// List habits with streaks
    List,
    /// Show habit details
    Show(IdArg),
    /// Mark a habit done for a day (default today)
    Done(HabitDayArgs),
    /// Undo a habit completion for a day (default today)
    Undo(HabitDayArgs),
    /// Edit habit fields and its linked tasks
    Edit(HabitEditArgs),
    /// Delete a habit and all its tasks
    Rm(IdArg),
    /// Make sure every habit has a task for tomorrow
    Regen,
    /// Create a one-off task from a habit
    Convert(IdArg),
    /// Manage habit categories
    Category(VocabCmd),
}

#[derive(Args)]
pub struct HabitAddArgs {
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// daily, weekly, monthly or custom
    #[arg(long)]
    pub frequency: Option<String>,
    /// Start of the time window (HH:MM)
    #[arg(long)]
    pub start: Option<String>,
    /// End of the time window (HH:MM)
    #[arg(long)]
    pub end: Option<String>,
    /// Reminder time (HH:MM)
    #[arg(long)]
    pub reminder: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub difficulty: Option<u8>,
    /// Include in calendar exports
    #[arg(long)]
    pub calendar: bool,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub motivation: Option<String>,
}

#[derive(Args)]
pub struct HabitDayArgs {
    /// ID or unique ID prefix
    pub id: String,
    /// Day (YYYY-MM-DD, today, yesterday)
    #[arg(long)]
    pub date: Option<String>,
}

/// Optional fields accept `none` to clear them
#[derive(Args)]
pub struct HabitEditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub frequency: Option<String>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub reminder: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub difficulty: Option<u8>,
    /// Include in calendar exports (true or false)
    #[arg(long)]
    pub calendar: Option<bool>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub motivation: Option<String>,
}

// ---------------------------------------------------------------------------
// Focus
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct FocusCmd {
    #[command(subcommand)]
    pub action: FocusAction,
}

#[derive(Subcommand)]
pub enum FocusAction {
    /// Start a focus session
    Start {
        /// Task being worked on
        #[arg(long)]
        task: Option<String>,
    },
    /// Log a distraction in the running session
    Distract {
        /// What pulled you away
        text: Vec<String>,
    },
    /// End the running session
    End {
        #[arg(long)]
        notes: Option<String>,
        /// 1 to 5
        #[arg(long)]
        rating: Option<u8>,
    },
    /// Show the running session
    Status,
    /// Totals and averages over all sessions
    Stats,
    /// Sessions started on a day (default today)
    Today {
        #[arg(long)]
        date: Option<String>,
    },
    /// Earned achievements, newest first
    Achievements {
        /// Show all, not just the most recent
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args)]
pub struct TimerArgs {
    /// pomodoro, short or long
    #[arg(long, default_value = "pomodoro")]
    pub mode: String,
    /// Task to attach to the focus session
    #[arg(long)]
    pub task: Option<String>,
}

// ---------------------------------------------------------------------------
// Brain dump
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct DumpCmd {
    #[command(subcommand)]
    pub action: DumpAction,
}

#[derive(Subcommand)]
pub enum DumpAction {
    /// Capture a thought
    Add { text: Vec<String> },
    /// List unprocessed items
    List {
        /// List processed items instead
        #[arg(long)]
        processed: bool,
        /// List everything
        #[arg(long)]
        all: bool,
    },
    /// Replace an item's text
    Edit { id: String, text: Vec<String> },
    /// Mark an item processed
    Process {
        id: String,
        /// Task the item became
        #[arg(long)]
        task: Option<String>,
    },
    /// Return an item to the unprocessed list
    Unprocess { id: String },
    /// Turn an item into a task
    Convert {
        id: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete an item
    Rm { id: String },
}

// ---------------------------------------------------------------------------
// Search, export, config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SearchArgs {
    /// Regular expression
    pub pattern: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: focusflow-calendar.ics)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Day to place events on (default tomorrow)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print effective values (default)
    Show,
    /// Set one key, e.g. `ff config set timer.pomodoro_minutes 50`
    Set { key: String, value: String },
    /// Print the path to config.toml
    Path,
}
