mod init;
pub use init::{cmd_init, init_data_dir};

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, NaiveDate};
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::DataLock;
use crate::io::store_io::{self, Slot};
use crate::model::focus::{FocusLog, Rating};
use crate::model::habit::{Frequency, HabitPatch, NewHabit, parse_hhmm};
use crate::model::task::{Difficulty, Level, NewTask, Task, TaskBook, TaskPatch};
use crate::model::workspace::Workspace;
use crate::ops::clock::{Clock, SystemClock};
use crate::ops::focus_ops::{self, RECENT_ACHIEVEMENTS};
use crate::ops::timer::{self, TimerSession, TimerStatus};
use crate::ops::{brain_dump_ops, calendar, check, habit_ops, search, task_ops};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let data_dir = store_io::resolve_data_dir(cli.data_dir.as_deref())?;
    let json = cli.json;
    let clock = SystemClock;
    let ctx = Ctx {
        data_dir: &data_dir,
        json,
        clock: &clock,
    };

    match cli.command {
        Commands::Init(args) => cmd_init(args, &data_dir),
        Commands::Task(cmd) => cmd_task(cmd, &ctx),
        Commands::Category(cmd) => cmd_category(cmd, &ctx),
        Commands::Tag(cmd) => cmd_tag(cmd, &ctx),
        Commands::Habit(cmd) => cmd_habit(cmd, &ctx),
        Commands::Focus(cmd) => cmd_focus(cmd, &ctx),
        Commands::Timer(args) => cmd_timer(args, &ctx),
        Commands::Dump(cmd) => cmd_dump(cmd, &ctx),
        Commands::Search(args) => cmd_search(args, &ctx),
        Commands::Check => cmd_check(&ctx),
        Commands::Export(args) => cmd_export(args, &ctx),
        Commands::Config(cmd) => cmd_config(cmd, &ctx),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// What every handler needs: where the data lives, output mode and time
struct Ctx<'a> {
    data_dir: &'a Path,
    json: bool,
    clock: &'a dyn Clock,
}

/// A workspace opened for writing. Holds the data lock until dropped.
struct Writer {
    ws: Workspace,
    swept: bool,
    _lock: DataLock,
}

impl Writer {
    /// Lock the data directory and load it. When configured, habit tasks
    /// for tomorrow are generated first.
    fn open(ctx: &Ctx<'_>) -> Result<Writer, Box<dyn std::error::Error>> {
        store_io::ensure_data_dir(ctx.data_dir)?;
        let lock = DataLock::acquire_default(ctx.data_dir)?;
        let mut ws = store_io::load_workspace(ctx.data_dir)?;
        let swept = ws.config.habits.regenerate_on_load
            && habit_ops::generate_tomorrow(&ws.habits, &mut ws.tasks, ctx.clock)? > 0;
        Ok(Writer {
            ws,
            swept,
            _lock: lock,
        })
    }

    /// Save the named slots, plus the task slot if the sweep touched it.
    fn save(&self, slots: &[Slot]) -> Result<(), store_io::StoreError> {
        let mut slots = slots.to_vec();
        if self.swept && !slots.contains(&Slot::Tasks) {
            slots.push(Slot::Tasks);
        }
        store_io::save_slots(&self.ws, &slots)
    }
}

fn load_read_only(ctx: &Ctx<'_>) -> Result<Workspace, store_io::StoreError> {
    store_io::load_workspace(ctx.data_dir)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a newly created record: its full ID in JSON mode, short otherwise
fn print_created(ctx: &Ctx<'_>, id: Uuid) -> CmdResult {
    if ctx.json {
        print_json(&CreatedJson { id })
    } else {
        println!("{}", short_id(&id));
        Ok(())
    }
}

/// Resolve a full UUID or a unique prefix of one.
fn resolve_id(ids: impl IntoIterator<Item = Uuid>, input: &str, what: &str) -> Result<Uuid, String> {
    let needle = input.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(format!("{} id cannot be empty", what));
    }
    let mut found: Option<Uuid> = None;
    let mut count = 0;
    for id in ids {
        if id.to_string().starts_with(&needle) {
            if id.to_string() == needle {
                return Ok(id);
            }
            found = Some(id);
            count += 1;
        }
    }
    match (found, count) {
        (Some(id), 1) => Ok(id),
        (Some(_), n) => Err(format!("ambiguous {} id '{}': matches {}", what, input, n)),
        (None, _) => Err(format!("{} not found: {}", what, input)),
    }
}

fn resolve_task(book: &TaskBook, input: &str) -> Result<Uuid, String> {
    resolve_id(book.tasks.keys().copied(), input, "task")
}

fn resolve_habit(ws: &Workspace, input: &str) -> Result<Uuid, String> {
    resolve_id(ws.habits.habits.keys().copied(), input, "habit")
}

fn resolve_item(ws: &Workspace, input: &str) -> Result<Uuid, String> {
    resolve_id(ws.brain_dump.items.iter().map(|i| i.id), input, "brain dump item")
}

fn resolve_subtask(task: &Task, input: &str) -> Result<Uuid, String> {
    resolve_id(task.subtasks.iter().map(|s| s.id), input, "subtask")
}

/// Parse a day: YYYY-MM-DD, today, tomorrow or yesterday
fn parse_day(s: &str, clock: &dyn Clock) -> Result<NaiveDate, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(clock.today()),
        "tomorrow" => Ok(clock.tomorrow()),
        "yesterday" => Ok(clock.today() - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{}': expected YYYY-MM-DD", s)),
    }
}

fn parse_level_arg(s: &str) -> Result<Level, String> {
    Level::parse_level(s).ok_or_else(|| format!("invalid level '{}' (expected: low, medium, high)", s))
}

fn parse_difficulty_arg(n: u8) -> Result<Difficulty, String> {
    Difficulty::new(n).ok_or_else(|| format!("difficulty must be 1-5, got {}", n))
}

fn parse_frequency_arg(s: &str) -> Result<Frequency, String> {
    Frequency::parse_frequency(s)
        .ok_or_else(|| format!("invalid frequency '{}' (expected: daily, weekly, monthly, custom)", s))
}

fn is_none_word(s: &str) -> bool {
    s.eq_ignore_ascii_case("none")
}

/// `--flag none` clears a field; any other value sets it
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if is_none_word(&v) { None } else { Some(v) })
}

fn clearable_with<T, E>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Option<Option<T>>, E> {
    match value {
        None => Ok(None),
        Some(v) if is_none_word(v) => Ok(Some(None)),
        Some(v) => parse(v).map(|t| Some(Some(t))),
    }
}

fn parse_minutes(s: &str) -> Result<i64, String> {
    s.parse::<i64>()
        .map_err(|_| format!("invalid minutes '{}'", s))
}

fn join_words(words: &[String]) -> String {
    words.join(" ")
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn cmd_task(cmd: TaskCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action {
        TaskAction::Add(args) => cmd_task_add(args, ctx),
        TaskAction::List(args) => cmd_task_list(args, ctx),
        TaskAction::Show(args) => cmd_task_show(args, ctx),
        TaskAction::Done(args) => cmd_task_done(args, ctx),
        TaskAction::Edit(args) => cmd_task_edit(args, ctx),
        TaskAction::Rm(args) => cmd_task_rm(args, ctx),
        TaskAction::Sub(sub) => cmd_task_sub(sub, ctx),
        TaskAction::Tag(tag) => cmd_task_tag(tag, ctx),
    }
}

fn cmd_task_add(args: TaskAddArgs, ctx: &Ctx<'_>) -> CmdResult {
    let mut draft = NewTask {
        title: args.title,
        description: args.description,
        category: args.category,
        estimated_minutes: args.estimate,
        tags: args.tags,
        reward: args.reward,
        notes: args.notes,
        ..Default::default()
    };
    if let Some(p) = args.priority.as_deref() {
        draft.priority = parse_level_arg(p)?;
    }
    if let Some(e) = args.energy.as_deref() {
        draft.energy_level = parse_level_arg(e)?;
    }
    if let Some(f) = args.focus.as_deref() {
        draft.focus_required = parse_level_arg(f)?;
    }
    if let Some(d) = args.difficulty {
        draft.difficulty = parse_difficulty_arg(d)?;
    }
    if let Some(due) = args.due.as_deref() {
        draft.due_date = Some(parse_day(due, ctx.clock)?);
    }

    let mut w = Writer::open(ctx)?;
    let id = task_ops::add_task(&mut w.ws.tasks, draft, ctx.clock)?;
    w.save(&[Slot::Tasks])?;
    print_created(ctx, id)
}

fn cmd_task_list(args: TaskListArgs, ctx: &Ctx<'_>) -> CmdResult {
    let ws = load_read_only(ctx)?;
    let priority = args.priority.as_deref().map(parse_level_arg).transpose()?;
    let filter = task_ops::TaskFilter {
        completed: if args.all { None } else { Some(false) },
        category: args.category.as_deref(),
        tag: args.tag.as_deref(),
        priority,
        due_on: args.due_today.then(|| ctx.clock.today()),
    };
    let tasks = task_ops::filter_tasks(&ws.tasks, &filter);

    if ctx.json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("no tasks");
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn cmd_task_show(args: IdArg, ctx: &Ctx<'_>) -> CmdResult {
    let ws = load_read_only(ctx)?;
    let id = resolve_task(&ws.tasks, &args.id)?;
    let task = &ws.tasks.tasks[&id];
    if ctx.json {
        return print_json(task);
    }
    for line in format_task_detail(task) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_task_done(args: IdArg, ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    let id = resolve_task(&w.ws.tasks, &args.id)?;
    let completed = task_ops::toggle_completion(&mut w.ws.tasks, id, ctx.clock)?;
    w.save(&[Slot::Tasks])?;
    if ctx.json {
        return print_json(&w.ws.tasks.tasks[&id]);
    }
    let task = &w.ws.tasks.tasks[&id];
    let state = if completed { "done" } else { "not done" };
    println!("{} {} is {}", short_id(&id), task.title, state);
    if completed && task.completion_streak > 1 {
        println!("streak: {}", task.completion_streak);
    }
    Ok(())
}

fn cmd_task_edit(args: TaskEditArgs, ctx: &Ctx<'_>) -> CmdResult {
    let patch = TaskPatch {
        title: args.title,
        description: clearable(args.description),
        due_date: clearable_with(args.due.as_deref(), |s| parse_day(s, ctx.clock))?,
        priority: args.priority.as_deref().map(parse_level_arg).transpose()?,
        category: args.category,
        estimated_minutes: clearable_with(args.estimate.as_deref(), parse_minutes)?,
        actual_minutes: clearable_with(args.actual.as_deref(), parse_minutes)?,
        notes: clearable(args.notes),
        difficulty: args.difficulty.map(parse_difficulty_arg).transpose()?,
        reward: clearable(args.reward),
        energy_level: args.energy.as_deref().map(parse_level_arg).transpose()?,
        focus_required: args.focus.as_deref().map(parse_level_arg).transpose()?,
        ..Default::default()
    };
    if patch.is_empty() {
        return Err("nothing to change (see `ff task edit --help`)".into());
    }

    let mut w = Writer::open(ctx)?;
    let id = resolve_task(&w.ws.tasks, &args.id)?;
    task_ops::update_task(&mut w.ws.tasks, id, patch, ctx.clock)?;
    w.save(&[Slot::Tasks])?;
    if ctx.json {
        return print_json(&w.ws.tasks.tasks[&id]);
    }
    println!("{}", format_task_line(&w.ws.tasks.tasks[&id]));
    Ok(())
}

fn cmd_task_rm(args: IdArg, ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    let id = resolve_task(&w.ws.tasks, &args.id)?;
    let task = task_ops::delete_task(&mut w.ws.tasks, id)?;
    w.save(&[Slot::Tasks])?;
    if !ctx.json {
        println!("deleted {} {}", short_id(&id), task.title);
    }
    Ok(())
}

fn cmd_task_sub(cmd: SubCmd, ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    let books = &mut w.ws.tasks;
    let task_arg = match &cmd.action {
        SubAction::Add { task, .. }
        | SubAction::Done { task, .. }
        | SubAction::Edit { task, .. }
        | SubAction::Rm { task, .. } => task.clone(),
    };
    let task_id = resolve_task(books, &task_arg)?;

    match cmd.action {
        SubAction::Add { title, .. } => {
            let sub = task_ops::add_subtask(books, task_id, title, ctx.clock)?;
            w.save(&[Slot::Tasks])?;
            print_created(ctx, sub)?;
        }
        SubAction::Done { sub, .. } => {
            let sub_id = resolve_subtask(&books.tasks[&task_id], &sub)?;
            let done = task_ops::toggle_subtask(books, task_id, sub_id, ctx.clock)?;
            w.save(&[Slot::Tasks])?;
            if !ctx.json {
                println!("{} {}", short_id(&sub_id), if done { "done" } else { "not done" });
            }
        }
        SubAction::Edit { sub, title, .. } => {
            let sub_id = resolve_subtask(&books.tasks[&task_id], &sub)?;
            task_ops::update_subtask(books, task_id, sub_id, title, ctx.clock)?;
            w.save(&[Slot::Tasks])?;
        }
        SubAction::Rm { sub, .. } => {
            let sub_id = resolve_subtask(&books.tasks[&task_id], &sub)?;
            task_ops::delete_subtask(books, task_id, sub_id, ctx.clock)?;
            w.save(&[Slot::Tasks])?;
        }
    }
    if ctx.json {
        return Ok(());
    }
    let (done, total) = w.ws.tasks.tasks[&task_id].subtask_progress();
    println!("subtasks: {}/{}", done, total);
    Ok(())
}

fn cmd_task_tag(cmd: TaskTagCmd, ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    let (id, tag, add) = match &cmd.action {
        TaskTagAction::Add { id, tag } => (id, tag, true),
        TaskTagAction::Rm { id, tag } => (id, tag, false),
    };
    let task_id = resolve_task(&w.ws.tasks, id)?;
    if add {
        task_ops::add_tag_to_task(&mut w.ws.tasks, task_id, tag, ctx.clock)?;
    } else {
        task_ops::remove_tag_from_task(&mut w.ws.tasks, task_id, tag, ctx.clock)?;
    }
    w.save(&[Slot::Tasks])?;
    if ctx.json {
        return print_json(&w.ws.tasks.tasks[&task_id].tags);
    }
    println!("{}", format_task_line(&w.ws.tasks.tasks[&task_id]));
    Ok(())
}

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

fn print_vocab(list: &[String], json: bool) -> CmdResult {
    if json {
        return print_json(list);
    }
    for entry in list {
        println!("{}", entry);
    }
    Ok(())
}

fn cmd_category(cmd: VocabCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action.unwrap_or(VocabAction::List) {
        VocabAction::List => print_vocab(&load_read_only(ctx)?.tasks.categories, ctx.json),
        VocabAction::Add { name } => {
            let mut w = Writer::open(ctx)?;
            if !task_ops::add_category(&mut w.ws.tasks, &name) {
                return Err(format!("category already exists or is empty: {}", name).into());
            }
            w.save(&[Slot::Tasks])?;
            print_vocab(&w.ws.tasks.categories, ctx.json)
        }
        VocabAction::Rm { name } => {
            let mut w = Writer::open(ctx)?;
            let moved = task_ops::delete_category(&mut w.ws.tasks, &name, ctx.clock);
            w.save(&[Slot::Tasks])?;
            if !ctx.json {
                println!("removed category {} ({} tasks moved to Uncategorized)", name, moved);
            }
            Ok(())
        }
    }
}

fn cmd_tag(cmd: VocabCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action.unwrap_or(VocabAction::List) {
        VocabAction::List => print_vocab(&load_read_only(ctx)?.tasks.tags, ctx.json),
        VocabAction::Add { name } => {
            let mut w = Writer::open(ctx)?;
            if !task_ops::add_tag(&mut w.ws.tasks, &name) {
                return Err(format!("tag already exists or is empty: {}", name).into());
            }
            w.save(&[Slot::Tasks])?;
            print_vocab(&w.ws.tasks.tags, ctx.json)
        }
        VocabAction::Rm { name } => {
            let mut w = Writer::open(ctx)?;
            let stripped = task_ops::delete_tag(&mut w.ws.tasks, &name, ctx.clock);
            w.save(&[Slot::Tasks])?;
            if !ctx.json {
                println!("removed tag {} from {} tasks", name, stripped);
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

fn cmd_habit(cmd: HabitCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action {
        HabitAction::Add(args) => cmd_habit_add(args, ctx),
        HabitAction::List => cmd_habit_list(ctx),
        HabitAction::Show(args) => cmd_habit_show(args, ctx),
        HabitAction::Done(args) => cmd_habit_mark(args, true, ctx),
        HabitAction::Undo(args) => cmd_habit_mark(args, false, ctx),
        HabitAction::Edit(args) => cmd_habit_edit(args, ctx),
        HabitAction::Rm(args) => cmd_habit_rm(args, ctx),
        HabitAction::Regen => cmd_habit_regen(ctx),
        HabitAction::Convert(args) => cmd_habit_convert(args, ctx),
        HabitAction::Category(cmd) => cmd_habit_category(cmd, ctx),
    }
}

fn cmd_habit_add(args: HabitAddArgs, ctx: &Ctx<'_>) -> CmdResult {
    let mut draft = NewHabit {
        title: args.title,
        description: args.description,
        start_time: args.start.as_deref().map(parse_hhmm).transpose()?,
        end_time: args.end.as_deref().map(parse_hhmm).transpose()?,
        reminder_time: args.reminder.as_deref().map(parse_hhmm).transpose()?,
        category: args.category,
        calendar_sync: args.calendar,
        motivation: args.motivation,
        ..Default::default()
    };
    if let Some(f) = args.frequency.as_deref() {
        draft.frequency = parse_frequency_arg(f)?;
    }
    if let Some(d) = args.difficulty {
        draft.difficulty = parse_difficulty_arg(d)?;
    }
    if let Some(c) = args.color {
        draft.color = c;
    }

    let mut w = Writer::open(ctx)?;
    let id = habit_ops::add_habit(&mut w.ws.habits, &mut w.ws.tasks, draft, ctx.clock)?;
    w.save(&[Slot::Habits, Slot::Tasks])?;
    print_created(ctx, id)
}

fn cmd_habit_list(ctx: &Ctx<'_>) -> CmdResult {
    let ws = load_read_only(ctx)?;
    let today = ctx.clock.today();
    if ctx.json {
        let out: Vec<HabitJson<'_>> = ws
            .habits
            .habits
            .values()
            .map(|h| HabitJson {
                habit: h,
                current_run: habit_ops::current_run(h, today),
                done_today: h.is_completed_on(today),
                linked_tasks: habit_ops::linked_task_ids(&ws.tasks, h).len(),
            })
            .collect();
        return print_json(&out);
    }
    if ws.habits.habits.is_empty() {
        println!("no habits");
    }
    for habit in ws.habits.habits.values() {
        println!(
            "{}",
            format_habit_line(habit, today, habit_ops::current_run(habit, today))
        );
    }
    Ok(())
}

fn cmd_habit_show(args: IdArg, ctx: &Ctx<'_>) -> CmdResult {
    let ws = load_read_only(ctx)?;
    let id = resolve_habit(&ws, &args.id)?;
    let habit = &ws.habits.habits[&id];
    let today = ctx.clock.today();
    let run = habit_ops::current_run(habit, today);
    let linked = habit_ops::linked_task_ids(&ws.tasks, habit).len();
    if ctx.json {
        return print_json(&HabitJson {
            habit,
            current_run: run,
            done_today: habit.is_completed_on(today),
            linked_tasks: linked,
        });
    }
    for line in format_habit_detail(habit, today, run, linked) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_habit_mark(args: HabitDayArgs, complete: bool, ctx: &Ctx<'_>) -> CmdResult {
    let day = match args.date.as_deref() {
        Some(d) => parse_day(d, ctx.clock)?,
        None => ctx.clock.today(),
    };
    let mut w = Writer::open(ctx)?;
    let id = resolve_habit(&w.ws, &args.id)?;
    let changed = if complete {
        habit_ops::mark_complete(&mut w.ws.habits, &mut w.ws.tasks, id, day, ctx.clock)?
    } else {
        habit_ops::mark_incomplete(&mut w.ws.habits, &mut w.ws.tasks, id, day, ctx.clock)?
    };
    if changed {
        w.save(&[Slot::Habits, Slot::Tasks])?;
    } else {
        w.save(&[])?;
    }

    let habit = &w.ws.habits.habits[&id];
    if ctx.json {
        return print_json(habit);
    }
    match (complete, changed) {
        (true, true) => println!("{} done on {} (streak {})", habit.title, day, habit.streak),
        (true, false) => println!("{} was already done on {}", habit.title, day),
        (false, true) => println!("{} undone on {} (streak {})", habit.title, day, habit.streak),
        (false, false) => println!("{} was not done on {}", habit.title, day),
    }
    Ok(())
}

fn cmd_habit_edit(args: HabitEditArgs, ctx: &Ctx<'_>) -> CmdResult {
    let patch = HabitPatch {
        title: args.title,
        description: clearable(args.description),
        frequency: args.frequency.as_deref().map(parse_frequency_arg).transpose()?,
        start_time: clearable_with(args.start.as_deref(), parse_hhmm)?,
        end_time: clearable_with(args.end.as_deref(), parse_hhmm)?,
        reminder_time: clearable_with(args.reminder.as_deref(), parse_hhmm)?,
        category: clearable(args.category),
        difficulty: args.difficulty.map(parse_difficulty_arg).transpose()?,
        calendar_sync: args.calendar,
        color: args.color,
        motivation: clearable(args.motivation),
        ..Default::default()
    };
    if patch == HabitPatch::default() {
        return Err("nothing to change (see `ff habit edit --help`)".into());
    }

    let mut w = Writer::open(ctx)?;
    let id = resolve_habit(&w.ws, &args.id)?;
    habit_ops::update_habit(&mut w.ws.habits, &mut w.ws.tasks, id, patch, ctx.clock)?;
    w.save(&[Slot::Habits, Slot::Tasks])?;
    let habit = &w.ws.habits.habits[&id];
    if ctx.json {
        return print_json(habit);
    }
    let today = ctx.clock.today();
    println!(
        "{}",
        format_habit_line(habit, today, habit_ops::current_run(habit, today))
    );
    Ok(())
}

fn cmd_habit_rm(args: IdArg, ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    let id = resolve_habit(&w.ws, &args.id)?;
    let title = w.ws.habits.habits[&id].title.clone();
    let removed = habit_ops::delete_habit(&mut w.ws.habits, &mut w.ws.tasks, id)?;
    w.save(&[Slot::Habits, Slot::Tasks])?;
    if !ctx.json {
        println!("deleted habit {} and {} linked tasks", title, removed);
    }
    Ok(())
}

fn cmd_habit_regen(ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    // the open sweep may already have done the work
    let created = habit_ops::generate_tomorrow(&w.ws.habits, &mut w.ws.tasks, ctx.clock)?;
    w.save(&[Slot::Tasks])?;
    if ctx.json {
        return print_json(&serde_json::json!({ "created": created, "swept_on_open": w.swept }));
    }
    let total = created + usize::from(w.swept);
    if total == 0 {
        println!("every habit already has a task for {}", ctx.clock.tomorrow());
    } else {
        println!("generated habit tasks for {}", ctx.clock.tomorrow());
    }
    Ok(())
}

fn cmd_habit_convert(args: IdArg, ctx: &Ctx<'_>) -> CmdResult {
    let mut w = Writer::open(ctx)?;
    let id = resolve_habit(&w.ws, &args.id)?;
    let task_id = habit_ops::convert_to_task(&w.ws.habits, &mut w.ws.tasks, id, ctx.clock.today(), ctx.clock)?;
    w.save(&[Slot::Tasks])?;
    print_created(ctx, task_id)
}

fn cmd_habit_category(cmd: VocabCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action.unwrap_or(VocabAction::List) {
        VocabAction::List => print_vocab(&load_read_only(ctx)?.habits.categories, ctx.json),
        VocabAction::Add { name } => {
            let mut w = Writer::open(ctx)?;
            if !habit_ops::add_category(&mut w.ws.habits, &name) {
                return Err(format!("habit category already exists or is empty: {}", name).into());
            }
            w.save(&[Slot::Habits])?;
            print_vocab(&w.ws.habits.categories, ctx.json)
        }
        VocabAction::Rm { name } => {
            let mut w = Writer::open(ctx)?;
            let cleared = habit_ops::delete_category(&mut w.ws.habits, &name);
            w.save(&[Slot::Habits])?;
            if !ctx.json {
                println!("removed habit category {} ({} habits cleared)", name, cleared);
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Focus
// ---------------------------------------------------------------------------

fn print_ended(ctx: &Ctx<'_>, ended: &focus_ops::EndedSession) -> CmdResult {
    if ctx.json {
        return print_json(&EndedSessionJson {
            session: &ended.session,
            achievements: &ended.achievements,
        });
    }
    println!("{}", format_session_line(&ended.session));
    for a in &ended.achievements {
        println!("achievement unlocked: {} - {}", a.title, a.description);
    }
    Ok(())
}

fn cmd_focus(cmd: FocusCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action {
        FocusAction::Start { task } => {
            let mut w = Writer::open(ctx)?;
            let task_id = task.as_deref().map(|t| resolve_task(&w.ws.tasks, t)).transpose()?;
            let id = focus_ops::start_session(&mut w.ws.focus, task_id, ctx.clock)?;
            w.save(&[Slot::Focus])?;
            print_created(ctx, id)
        }
        FocusAction::Distract { text } => {
            let mut w = Writer::open(ctx)?;
            let text = join_words(&text);
            let description = (!text.trim().is_empty()).then_some(text);
            let id = focus_ops::add_distraction(&mut w.ws.focus, description, ctx.clock)
                .ok_or("no focus session running (start one with `ff focus start`)")?;
            w.save(&[Slot::Focus])?;
            let count = w.ws.focus.current.as_ref().map_or(0, |s| s.distractions.len());
            if ctx.json {
                return print_json(&CreatedJson { id });
            }
            println!("distraction logged ({} this session)", count);
            Ok(())
        }
        FocusAction::End { notes, rating } => {
            let rating = rating
                .map(|r| Rating::new(r).ok_or_else(|| format!("rating must be 1-5, got {}", r)))
                .transpose()?;
            let mut w = Writer::open(ctx)?;
            let ended = focus_ops::end_session(&mut w.ws.focus, notes, rating, ctx.clock)
                .ok_or("no focus session running")?;
            w.save(&[Slot::Focus])?;
            print_ended(ctx, &ended)
        }
        FocusAction::Status => {
            let ws = load_read_only(ctx)?;
            let elapsed = focus_ops::elapsed_minutes(&ws.focus, ctx.clock);
            if ctx.json {
                return print_json(&FocusStatusJson {
                    running: ws.focus.current.is_some(),
                    session: ws.focus.current.as_ref(),
                    elapsed_minutes: elapsed,
                });
            }
            match (&ws.focus.current, elapsed) {
                (Some(s), Some(m)) => {
                    let task = s
                        .task_id
                        .and_then(|t| ws.tasks.tasks.get(&t))
                        .map(|t| format!(" on {}", t.title))
                        .unwrap_or_default();
                    println!(
                        "focusing{} for {} min, {} distractions",
                        task,
                        m,
                        s.distractions.len()
                    );
                }
                _ => println!("no focus session running"),
            }
            Ok(())
        }
        FocusAction::Stats => {
            let ws = load_read_only(ctx)?;
            let stats = focus_ops::stats(&ws.focus, ctx.clock);
            if ctx.json {
                return print_json(&stats);
            }
            println!("sessions: {}", stats.sessions);
            println!("total focus: {} min", stats.total_minutes);
            println!("average session: {} min", stats.average_minutes);
            println!("average distractions: {:.1}", stats.average_distractions);
            println!("achievements: {}", stats.achievements);
            if stats.in_progress {
                println!("a session is running");
            }
            Ok(())
        }
        FocusAction::Today { date } => {
            let ws = load_read_only(ctx)?;
            let day = match date.as_deref() {
                Some(d) => parse_day(d, ctx.clock)?,
                None => ctx.clock.today(),
            };
            let sessions = focus_ops::sessions_on(&ws.focus, day);
            if ctx.json {
                return print_json(&sessions);
            }
            let total: i64 = sessions.iter().map(|s| s.duration_minutes).sum();
            for s in &sessions {
                println!("{}", format_session_line(s));
            }
            println!("{} sessions, {} min on {}", sessions.len(), total, day);
            Ok(())
        }
        FocusAction::Achievements { all } => {
            let ws = load_read_only(ctx)?;
            let limit = if all { usize::MAX } else { RECENT_ACHIEVEMENTS };
            let recent = focus_ops::recent_achievements(&ws.focus, limit);
            if ctx.json {
                return print_json(&recent);
            }
            if recent.is_empty() {
                println!("no achievements yet");
            }
            for a in recent {
                println!("{}", format_achievement_line(a));
            }
            Ok(())
        }
    }
}

/// Lock, load the focus log, apply `f`, save. Keeps the lock only for the
/// duration of one change so other `ff` commands can run during a timer.
fn with_focus<R>(
    ctx: &Ctx<'_>,
    f: impl FnOnce(&mut FocusLog) -> R,
) -> Result<R, Box<dyn std::error::Error>> {
    let mut w = Writer::open(ctx)?;
    let out = f(&mut w.ws.focus);
    w.save(&[Slot::Focus])?;
    Ok(out)
}

/// A line typed at a running timer
#[derive(Debug, Clone, PartialEq, Eq)]
enum TimerCommand {
    Pause(Option<String>),
    Resume,
    Skip,
    Reset,
}

fn parse_timer_command(line: &str) -> Option<TimerCommand> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match word.to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(TimerCommand::Pause((!rest.is_empty()).then(|| rest.to_string()))),
        "c" | "continue" | "resume" => Some(TimerCommand::Resume),
        "s" | "skip" => Some(TimerCommand::Skip),
        "r" | "reset" => Some(TimerCommand::Reset),
        _ => None,
    }
}

/// Forward stdin lines to the timer loop. The thread ends at EOF.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

enum TimerStep {
    Continue,
    Done,
}

/// Apply one typed command. Skip and reset end the run.
fn apply_timer_command(
    cmd: TimerCommand,
    ts: &mut TimerSession,
    ctx: &Ctx<'_>,
) -> Result<TimerStep, Box<dyn std::error::Error>> {
    match cmd {
        TimerCommand::Pause(reason) => {
            if with_focus(ctx, |log| ts.pause(log, reason.as_deref(), ctx.clock))? && !ctx.json {
                println!("\rpaused; `c` to continue");
            }
            Ok(TimerStep::Continue)
        }
        TimerCommand::Resume => {
            if ts.timer.status() == TimerStatus::Paused {
                ts.timer.start();
            }
            Ok(TimerStep::Continue)
        }
        TimerCommand::Skip | TimerCommand::Reset => {
            let mode = ts.timer.mode();
            let skip = cmd == TimerCommand::Skip;
            let ended = with_focus(ctx, |log| {
                if skip {
                    ts.skip(log, ctx.clock)
                } else {
                    ts.reset(log, ctx.clock)
                }
            })?;
            let action = if skip { "skipped" } else { "reset" };
            if let Some(ended) = &ended {
                if !ctx.json {
                    println!("\r{} {}", mode.label(), action);
                }
                print_ended(ctx, ended)?;
            } else if ctx.json {
                print_json(&serde_json::json!({
                    "action": action,
                    "mode": mode.label(),
                    "next": ts.timer.mode().label(),
                }))?;
            } else {
                println!("\r{} {}", mode.label(), action);
            }
            Ok(TimerStep::Done)
        }
    }
}

fn cmd_timer(args: TimerArgs, ctx: &Ctx<'_>) -> CmdResult {
    let mode = timer::parse_mode(&args.mode)
        .ok_or_else(|| format!("invalid mode '{}' (expected: pomodoro, short, long)", args.mode))?;
    let ws = load_read_only(ctx)?;
    let task_id = args.task.as_deref().map(|t| resolve_task(&ws.tasks, t)).transpose()?;
    let mut ts = TimerSession::new(ws.config.timer.clone(), task_id);
    ts.timer.set_mode(mode);
    drop(ws);

    let started = with_focus(ctx, |log| ts.start(log, ctx.clock))??;
    if !ctx.json {
        if started.started {
            eprintln!("focus session started");
        }
        eprintln!("commands: p [reason] pause, c continue, s skip, r reset");
    }

    let mut commands = Some(spawn_stdin_reader());
    let mut next_tick = Instant::now() + StdDuration::from_secs(1);
    let mut stdout = std::io::stdout();
    loop {
        if !ctx.json && ts.timer.status() == TimerStatus::Running {
            print!(
                "\r{} {} ",
                ts.timer.mode().label(),
                ts.timer.format_remaining()
            );
            stdout.flush()?;
        }

        let wait = next_tick.saturating_duration_since(Instant::now());
        let received = match &commands {
            Some(rx) => match rx.recv_timeout(wait) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    commands = None;
                    continue;
                }
            },
            None => {
                std::thread::sleep(wait);
                None
            }
        };
        if let Some(line) = received {
            match parse_timer_command(&line) {
                Some(cmd) => {
                    if let TimerStep::Done = apply_timer_command(cmd, &mut ts, ctx)? {
                        return Ok(());
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("\runknown timer command '{}'", line.trim()),
            }
            continue;
        }
        next_tick += StdDuration::from_secs(1);
        if ts.timer.status() != TimerStatus::Running {
            continue;
        }

        // only the last second of a phase can touch the focus log
        let outcome = if ts.timer.remaining_secs() <= 1 {
            with_focus(ctx, |log| ts.tick(log, ctx.clock))??
        } else {
            ts.timer.tick();
            Default::default()
        };

        let Some(change) = outcome.phase else {
            continue;
        };
        if !ctx.json {
            println!("\r{} finished", change.finished.label());
        }
        if let Some(ended) = &outcome.ended {
            print_ended(ctx, ended)?;
        }
        if ctx.json {
            print_json(&serde_json::json!({
                "finished": change.finished.label(),
                "next": change.next.label(),
                "completed_pomodoros": ts.timer.completed_pomodoros(),
            }))?;
        }
        if ts.timer.status() == TimerStatus::Completed {
            if !ctx.json {
                println!("next up: {} (run `ff timer --mode ...` to start)", change.next.label());
            }
            return Ok(());
        }
    }
}

// ---------------------------------------------------------------------------
// Brain dump
// ---------------------------------------------------------------------------

fn cmd_dump(cmd: DumpCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action {
        DumpAction::Add { text } => {
            let mut w = Writer::open(ctx)?;
            let id = brain_dump_ops::add_item(&mut w.ws.brain_dump, &join_words(&text), ctx.clock)?;
            w.save(&[Slot::BrainDump])?;
            print_created(ctx, id)
        }
        DumpAction::List { processed, all } => {
            let ws = load_read_only(ctx)?;
            let items = if all {
                ws.brain_dump.items.iter().collect()
            } else if processed {
                brain_dump_ops::processed_items(&ws.brain_dump)
            } else {
                brain_dump_ops::unprocessed_items(&ws.brain_dump)
            };
            if ctx.json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("brain dump is empty");
            }
            for item in items {
                println!("{}", format_item_line(item));
            }
            Ok(())
        }
        DumpAction::Edit { id, text } => {
            let mut w = Writer::open(ctx)?;
            let item_id = resolve_item(&w.ws, &id)?;
            brain_dump_ops::update_content(&mut w.ws.brain_dump, item_id, &join_words(&text))?;
            w.save(&[Slot::BrainDump])?;
            Ok(())
        }
        DumpAction::Process { id, task } => {
            let mut w = Writer::open(ctx)?;
            let item_id = resolve_item(&w.ws, &id)?;
            let task_id = task.as_deref().map(|t| resolve_task(&w.ws.tasks, t)).transpose()?;
            brain_dump_ops::mark_processed(&mut w.ws.brain_dump, item_id, task_id)?;
            w.save(&[Slot::BrainDump])?;
            Ok(())
        }
        DumpAction::Unprocess { id } => {
            let mut w = Writer::open(ctx)?;
            let item_id = resolve_item(&w.ws, &id)?;
            brain_dump_ops::mark_unprocessed(&mut w.ws.brain_dump, item_id)?;
            w.save(&[Slot::BrainDump])?;
            Ok(())
        }
        DumpAction::Convert {
            id,
            category,
            priority,
            due,
        } => {
            let mut draft = NewTask {
                category,
                ..Default::default()
            };
            if let Some(p) = priority.as_deref() {
                draft.priority = parse_level_arg(p)?;
            }
            if let Some(d) = due.as_deref() {
                draft.due_date = Some(parse_day(d, ctx.clock)?);
            }
            let mut w = Writer::open(ctx)?;
            let item_id = resolve_item(&w.ws, &id)?;
            let task_id = brain_dump_ops::convert_to_task(
                &mut w.ws.brain_dump,
                &mut w.ws.tasks,
                item_id,
                draft,
                ctx.clock,
            )?;
            w.save(&[Slot::BrainDump, Slot::Tasks])?;
            print_created(ctx, task_id)
        }
        DumpAction::Rm { id } => {
            let mut w = Writer::open(ctx)?;
            let item_id = resolve_item(&w.ws, &id)?;
            brain_dump_ops::delete_item(&mut w.ws.brain_dump, item_id)?;
            w.save(&[Slot::BrainDump])?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Search, check, export, config
// ---------------------------------------------------------------------------

fn cmd_search(args: SearchArgs, ctx: &Ctx<'_>) -> CmdResult {
    let re = Regex::new(&args.pattern).map_err(|e| format!("invalid regex: {}", e))?;
    let ws = load_read_only(ctx)?;
    let mut hits = search::search_tasks(&ws.tasks, &re);
    hits.extend(search::search_habits(&ws.habits, &re));
    hits.extend(search::search_brain_dump(&ws.brain_dump, &re));

    if ctx.json {
        let out: Vec<SearchHitJson> = hits.iter().map(search_hit_to_json).collect();
        return print_json(&out);
    }
    if hits.is_empty() {
        println!("no matches");
    }
    for hit in &hits {
        let title = match hit.owner {
            search::HitOwner::Task(id) => ws.tasks.tasks.get(&id).map(|t| t.title.as_str()),
            search::HitOwner::Habit(id) => ws.habits.habits.get(&id).map(|h| h.title.as_str()),
            search::HitOwner::BrainDump(_) => Some(hit.text.as_str()),
        };
        println!("{}", format_search_hit(hit, title.unwrap_or("")));
    }
    Ok(())
}

fn cmd_check(ctx: &Ctx<'_>) -> CmdResult {
    let ws = load_read_only(ctx)?;
    let result = check::check_workspace(&ws, ctx.clock);

    if ctx.json {
        return print_json(&result);
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            println!("{}", format_check_error(err));
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            println!();
        }
        println!("Warnings:");
        for w in &result.warnings {
            println!("{}", format_check_warning(w));
        }
    }
    if result.valid {
        println!("✓ data is valid");
    } else {
        println!("✗ data has errors");
    }
    Ok(())
}

fn cmd_export(args: ExportArgs, ctx: &Ctx<'_>) -> CmdResult {
    let ws = load_read_only(ctx)?;
    let day = match args.date.as_deref() {
        Some(d) => parse_day(d, ctx.clock)?,
        None => ctx.clock.tomorrow(),
    };
    let events = calendar::habit_events(&ws.habits);
    let ics = calendar::to_icalendar(&events, day, ctx.clock.now());
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(calendar::DEFAULT_EXPORT_FILE));

    if let Err(e) = store_io::atomic_write(&out, ics.as_bytes()) {
        warn!(path = %out.display(), error = %e, "calendar export failed");
        return Err(format!("could not write {}: {}", out.display(), e).into());
    }
    if ctx.json {
        return print_json(&serde_json::json!({
            "path": out,
            "events": events.len(),
            "date": day,
        }));
    }
    println!("exported {} events to {}", events.len(), out.display());
    Ok(())
}

fn cmd_config(cmd: ConfigCmd, ctx: &Ctx<'_>) -> CmdResult {
    match cmd.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = config_io::load_config(ctx.data_dir)?;
            if ctx.json {
                return print_json(&config);
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            store_io::ensure_data_dir(ctx.data_dir)?;
            let _lock = DataLock::acquire_default(ctx.data_dir)?;
            let mut doc = config_io::read_config_doc(ctx.data_dir)?;
            config_io::set_key(&mut doc, &key, &value)?;
            config_io::write_config_doc(ctx.data_dir, &doc)?;
            if !ctx.json {
                println!("{} = {}", key, value);
            }
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", ctx.data_dir.join(config_io::CONFIG_FILE).display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::clock::FixedClock;

    fn ids() -> Vec<Uuid> {
        [
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "67e5aaaa-10b1-426f-9247-bb680e5fe0c8",
            "0b9e1c2d-0000-4000-8000-000000000000",
        ]
        .iter()
        .map(|s| Uuid::parse_str(s).unwrap())
        .collect()
    }

    #[test]
    fn timer_commands_from_typed_lines() {
        assert_eq!(
            parse_timer_command("p  phone call "),
            Some(TimerCommand::Pause(Some("phone call".into())))
        );
        assert_eq!(parse_timer_command("pause"), Some(TimerCommand::Pause(None)));
        assert_eq!(parse_timer_command("C"), Some(TimerCommand::Resume));
        assert_eq!(parse_timer_command(" s\n"), Some(TimerCommand::Skip));
        assert_eq!(parse_timer_command("reset"), Some(TimerCommand::Reset));
        assert_eq!(parse_timer_command("x"), None);
        assert_eq!(parse_timer_command(""), None);
    }

    #[test]
    fn resolve_unique_prefix() {
        let ids = ids();
        assert_eq!(resolve_id(ids.clone(), "0b9e", "task").unwrap(), ids[2]);
        assert_eq!(resolve_id(ids.clone(), "67E55", "task").unwrap(), ids[0]);
    }

    #[test]
    fn resolve_full_id_and_errors() {
        let ids = ids();
        let full = ids[1].to_string();
        assert_eq!(resolve_id(ids.clone(), &full, "task").unwrap(), ids[1]);

        let err = resolve_id(ids.clone(), "67e5", "task").unwrap_err();
        assert!(err.contains("ambiguous"));
        let err = resolve_id(ids.clone(), "ffff", "habit").unwrap_err();
        assert_eq!(err, "habit not found: ffff");
        assert!(resolve_id(ids, "  ", "task").is_err());
    }

    #[test]
    fn parse_day_words_and_dates() {
        let clock = FixedClock::at_local(2025, 5, 14, 9, 0);
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(parse_day("today", &clock).unwrap(), d(2025, 5, 14));
        assert_eq!(parse_day("Tomorrow", &clock).unwrap(), d(2025, 5, 15));
        assert_eq!(parse_day("yesterday", &clock).unwrap(), d(2025, 5, 13));
        assert_eq!(parse_day("2025-06-01", &clock).unwrap(), d(2025, 6, 1));
        assert!(parse_day("06/01/2025", &clock).is_err());
    }

    #[test]
    fn clearable_values() {
        assert_eq!(clearable(None), None);
        assert_eq!(clearable(Some("none".into())), Some(None));
        assert_eq!(clearable(Some("x".into())), Some(Some("x".into())));
        assert_eq!(clearable_with(Some("NONE"), parse_minutes), Ok(Some(None)));
        assert_eq!(clearable_with(Some("15"), parse_minutes), Ok(Some(Some(15))));
        assert!(clearable_with(Some("soon"), parse_minutes).is_err());
    }
}
