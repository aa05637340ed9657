use tracing::debug;
use uuid::Uuid;

use crate::model::brain_dump::{BrainDump, BrainDumpItem, ItemId};
use crate::model::task::{NewTask, TaskBook, TaskId};
use crate::ops::clock::Clock;
use crate::ops::task_ops::{self, TaskError};

/// Error type for brain dump operations
#[derive(Debug, thiserror::Error)]
pub enum BrainDumpError {
    #[error("brain dump item not found: {0}")]
    NotFound(ItemId),
    #[error("brain dump content cannot be empty")]
    EmptyContent,
    #[error("task error: {0}")]
    Task(#[from] TaskError),
}

fn item_mut(dump: &mut BrainDump, id: ItemId) -> Result<&mut BrainDumpItem, BrainDumpError> {
    dump.items
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or(BrainDumpError::NotFound(id))
}

pub fn find_item(dump: &BrainDump, id: ItemId) -> Option<&BrainDumpItem> {
    dump.items.iter().find(|i| i.id == id)
}

/// Capture a thought. Returns the new item's ID.
pub fn add_item(dump: &mut BrainDump, content: &str, clock: &dyn Clock) -> Result<ItemId, BrainDumpError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(BrainDumpError::EmptyContent);
    }
    let id = Uuid::new_v4();
    dump.items.push(BrainDumpItem {
        id,
        content: content.to_string(),
        created_at: clock.now(),
        processed: false,
        converted_to_task_id: None,
    });
    debug!(item = %id, "brain dump item added");
    Ok(id)
}

pub fn update_content(dump: &mut BrainDump, id: ItemId, content: &str) -> Result<(), BrainDumpError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(BrainDumpError::EmptyContent);
    }
    item_mut(dump, id)?.content = content.to_string();
    debug!(item = %id, "brain dump item updated");
    Ok(())
}

pub fn delete_item(dump: &mut BrainDump, id: ItemId) -> Result<BrainDumpItem, BrainDumpError> {
    let idx = dump
        .items
        .iter()
        .position(|i| i.id == id)
        .ok_or(BrainDumpError::NotFound(id))?;
    debug!(item = %id, "brain dump item deleted");
    Ok(dump.items.remove(idx))
}

/// Mark an item processed, optionally linking the task it became.
pub fn mark_processed(
    dump: &mut BrainDump,
    id: ItemId,
    task_id: Option<TaskId>,
) -> Result<(), BrainDumpError> {
    let item = item_mut(dump, id)?;
    item.processed = true;
    if task_id.is_some() {
        item.converted_to_task_id = task_id;
    }
    debug!(item = %id, task = ?task_id, "brain dump item processed");
    Ok(())
}

/// Return an item to the unprocessed list. The forward link is cleared.
pub fn mark_unprocessed(dump: &mut BrainDump, id: ItemId) -> Result<(), BrainDumpError> {
    let item = item_mut(dump, id)?;
    item.processed = false;
    item.converted_to_task_id = None;
    debug!(item = %id, "brain dump item unprocessed");
    Ok(())
}

/// Turn an item into a task. `draft` supplies everything but the title,
/// which comes from the item's content when the draft's title is blank.
/// The item is marked processed and linked to the new task.
pub fn convert_to_task(
    dump: &mut BrainDump,
    tasks: &mut TaskBook,
    id: ItemId,
    mut draft: NewTask,
    clock: &dyn Clock,
) -> Result<TaskId, BrainDumpError> {
    let item = find_item(dump, id).ok_or(BrainDumpError::NotFound(id))?;
    if draft.title.trim().is_empty() {
        draft.title = item.content.clone();
    }
    let task_id = task_ops::add_task(tasks, draft, clock)?;
    mark_processed(dump, id, Some(task_id))?;
    Ok(task_id)
}

pub fn unprocessed_items(dump: &BrainDump) -> Vec<&BrainDumpItem> {
    dump.items.iter().filter(|i| !i.processed).collect()
}

pub fn processed_items(dump: &BrainDump) -> Vec<&BrainDumpItem> {
    dump.items.iter().filter(|i| i.processed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::clock::FixedClock;

    fn clock() -> FixedClock {
        FixedClock::at_local(2025, 5, 14, 9, 0)
    }

    #[test]
    fn add_trims_and_rejects_empty() {
        let mut dump = BrainDump::default();
        let id = add_item(&mut dump, "  call the dentist ", &clock()).unwrap();
        assert_eq!(find_item(&dump, id).unwrap().content, "call the dentist");
        assert!(matches!(
            add_item(&mut dump, "   ", &clock()),
            Err(BrainDumpError::EmptyContent)
        ));
        assert_eq!(dump.items.len(), 1);
    }

    #[test]
    fn process_and_unprocess_round_trip() {
        let mut dump = BrainDump::default();
        let id = add_item(&mut dump, "idea", &clock()).unwrap();
        let task = Uuid::new_v4();
        mark_processed(&mut dump, id, Some(task)).unwrap();
        assert_eq!(processed_items(&dump).len(), 1);
        assert_eq!(find_item(&dump, id).unwrap().converted_to_task_id, Some(task));

        mark_unprocessed(&mut dump, id).unwrap();
        let item = find_item(&dump, id).unwrap();
        assert!(!item.processed);
        assert!(item.converted_to_task_id.is_none());
        assert_eq!(unprocessed_items(&dump).len(), 1);
    }

    #[test]
    fn convert_creates_linked_task() {
        let clock = clock();
        let mut dump = BrainDump::default();
        let mut tasks = TaskBook::default();
        let id = add_item(&mut dump, "buy stamps", &clock).unwrap();

        let task_id = convert_to_task(&mut dump, &mut tasks, id, NewTask::default(), &clock).unwrap();
        assert_eq!(tasks.tasks[&task_id].title, "buy stamps");
        let item = find_item(&dump, id).unwrap();
        assert!(item.processed);
        assert_eq!(item.converted_to_task_id, Some(task_id));
    }

    #[test]
    fn unknown_ids_leave_state_untouched() {
        let clock = clock();
        let mut dump = BrainDump::default();
        let mut tasks = TaskBook::default();
        add_item(&mut dump, "keep", &clock).unwrap();
        let before = dump.clone();
        let ghost = Uuid::new_v4();

        assert!(matches!(delete_item(&mut dump, ghost), Err(BrainDumpError::NotFound(_))));
        assert!(update_content(&mut dump, ghost, "x").is_err());
        assert!(mark_processed(&mut dump, ghost, None).is_err());
        assert!(convert_to_task(&mut dump, &mut tasks, ghost, NewTask::default(), &clock).is_err());
        assert_eq!(dump, before);
        assert!(tasks.tasks.is_empty());
    }

    #[test]
    fn delete_removes_item() {
        let mut dump = BrainDump::default();
        let a = add_item(&mut dump, "a", &clock()).unwrap();
        let b = add_item(&mut dump, "b", &clock()).unwrap();
        let removed = delete_item(&mut dump, a).unwrap();
        assert_eq!(removed.content, "a");
        assert_eq!(dump.items.len(), 1);
        assert_eq!(dump.items[0].id, b);
    }
}
