use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::TaskId;

pub type ItemId = Uuid;

/// A quick-capture thought, processed later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainDumpItem {
    pub id: ItemId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed: bool,
    /// The task this item became, if it was turned into one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_to_task_id: Option<TaskId>,
}

/// The brain dump store, in capture order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainDump {
    #[serde(default)]
    pub items: Vec<BrainDumpItem>,
}
