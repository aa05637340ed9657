pub mod achievements;
pub mod brain_dump_ops;
pub mod calendar;
pub mod check;
pub mod clock;
pub mod focus_ops;
pub mod habit_ops;
pub mod search;
pub mod task_ops;
pub mod timer;
