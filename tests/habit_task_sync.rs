//! Habit and task stores kept in step across days and across a save/load.

use chrono::{Duration, NaiveDate};
use focusflow::io::store_io::{self, Slot};
use focusflow::model::{HABIT_TAG, HabitPatch, NewHabit, NewTask, Workspace};
use focusflow::ops::clock::{Clock, FixedClock};
use focusflow::ops::{habit_ops, task_ops};
use pretty_assertions::assert_eq;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Due dates of every task linked to the habit, sorted
fn linked_days(ws: &Workspace, habit_id: uuid::Uuid) -> Vec<NaiveDate> {
    let habit = &ws.habits.habits[&habit_id];
    let mut days: Vec<NaiveDate> = habit_ops::linked_task_ids(&ws.tasks, habit)
        .into_iter()
        .filter_map(|id| ws.tasks.tasks[&id].due_date)
        .collect();
    days.sort();
    days
}

#[test]
fn one_shadow_task_per_day_across_a_week() {
    let tmp = tempfile::TempDir::new().unwrap();
    let clock = FixedClock::at_local(2025, 4, 7, 8, 0);
    let mut ws = Workspace::empty(tmp.path().to_path_buf());
    let id = habit_ops::add_habit(
        &mut ws.habits,
        &mut ws.tasks,
        NewHabit::titled("Stretch"),
        &clock,
    )
    .unwrap();

    for _ in 0..3 {
        clock.advance(Duration::days(1));
        // twice a day, as a command and the load sweep might
        habit_ops::generate_tomorrow(&ws.habits, &mut ws.tasks, &clock).unwrap();
        habit_ops::generate_tomorrow(&ws.habits, &mut ws.tasks, &clock).unwrap();
    }

    assert_eq!(
        linked_days(&ws, id),
        vec![day(2025, 4, 8), day(2025, 4, 9), day(2025, 4, 10), day(2025, 4, 11)]
    );
}

#[test]
fn completion_flows_into_the_task_for_that_day() {
    let tmp = tempfile::TempDir::new().unwrap();
    let clock = FixedClock::at_local(2025, 4, 7, 8, 0);
    let mut ws = Workspace::empty(tmp.path().to_path_buf());
    let id = habit_ops::add_habit(
        &mut ws.habits,
        &mut ws.tasks,
        NewHabit::titled("Walk"),
        &clock,
    )
    .unwrap();

    clock.advance(Duration::days(1));
    let today = clock.today();
    habit_ops::mark_complete(&mut ws.habits, &mut ws.tasks, id, today, &clock).unwrap();

    let habit = &ws.habits.habits[&id];
    let task_id = habit_ops::linked_task_on(&ws.tasks, habit, today).unwrap();
    assert!(ws.tasks.tasks[&task_id].completed);
    assert_eq!(habit_ops::current_run(habit, today), 1);

    habit_ops::mark_incomplete(&mut ws.habits, &mut ws.tasks, id, today, &clock).unwrap();
    assert!(!ws.tasks.tasks[&task_id].completed);
    assert_eq!(ws.habits.habits[&id].streak, 0);
}

#[test]
fn rename_adopts_legacy_title_linked_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    let clock = FixedClock::at_local(2025, 4, 7, 8, 0);
    let mut ws = Workspace::empty(tmp.path().to_path_buf());
    let id = habit_ops::add_habit(
        &mut ws.habits,
        &mut ws.tasks,
        NewHabit::titled("Journal"),
        &clock,
    )
    .unwrap();

    // a task written before tasks carried their habit's id
    let legacy = task_ops::add_task(
        &mut ws.tasks,
        NewTask {
            title: "Journal".into(),
            tags: vec![HABIT_TAG.into()],
            due_date: Some(day(2025, 4, 7)),
            ..Default::default()
        },
        &clock,
    )
    .unwrap();
    let unrelated = task_ops::add_task(&mut ws.tasks, NewTask::titled("Journal"), &clock).unwrap();

    habit_ops::update_habit(
        &mut ws.habits,
        &mut ws.tasks,
        id,
        HabitPatch {
            title: Some("Evening journal".into()),
            ..Default::default()
        },
        &clock,
    )
    .unwrap();

    let legacy_task = &ws.tasks.tasks[&legacy];
    assert_eq!(legacy_task.title, "Evening journal");
    assert_eq!(legacy_task.habit_id, Some(id));
    // untagged tasks are never treated as shadow tasks
    assert_eq!(ws.tasks.tasks[&unrelated].title, "Journal");
    assert_eq!(linked_days(&ws, id), vec![day(2025, 4, 7), day(2025, 4, 8)]);
}

#[test]
fn links_survive_save_and_load() {
    let tmp = tempfile::TempDir::new().unwrap();
    let clock = FixedClock::at_local(2025, 4, 7, 8, 0);
    let mut ws = Workspace::empty(tmp.path().to_path_buf());
    let id = habit_ops::add_habit(
        &mut ws.habits,
        &mut ws.tasks,
        NewHabit::titled("Floss"),
        &clock,
    )
    .unwrap();
    habit_ops::mark_complete(&mut ws.habits, &mut ws.tasks, id, day(2025, 4, 6), &clock).unwrap();
    store_io::save_slots(&ws, &[Slot::Tasks, Slot::Habits]).unwrap();

    let loaded = store_io::load_workspace(tmp.path()).unwrap();
    assert_eq!(loaded.tasks, ws.tasks);
    assert_eq!(loaded.habits, ws.habits);
    assert_eq!(linked_days(&loaded, id), vec![day(2025, 4, 8)]);

    let mut loaded = loaded;
    let removed = habit_ops::delete_habit(&mut loaded.habits, &mut loaded.tasks, id).unwrap();
    assert_eq!(removed, 1);
    assert!(loaded.tasks.tasks.is_empty());
}
