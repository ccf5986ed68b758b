use serde::{Deserialize, Serialize};

use crate::sql::Field;

/// Manual sort order not set
pub const NO_ORDER: i32 = -1;

/// Glyph identifiers shown next to filters and tags
pub mod icons {
    pub const LABEL: i32 = 1;
    pub const TODAY: i32 = 2;
    pub const HISTORY: i32 = 3;
}

pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub title: String,
    /// Millis since epoch, 0 when unset
    pub due_date: i64,
    pub hide_until: i64,
    pub completed: i64,
    pub deleted: i64,
    pub created: i64,
    pub modified: i64,
    pub remote_id: String,
}

impl Task {
    pub const TABLE: &'static str = "tasks";
    pub const ID: Field = Field::new(Self::TABLE, "_id");
    pub const DUE_DATE: Field = Field::new(Self::TABLE, "dueDate");
    pub const HIDE_UNTIL: Field = Field::new(Self::TABLE, "hideUntil");
    pub const COMPLETION_DATE: Field = Field::new(Self::TABLE, "completed");
    pub const DELETION_DATE: Field = Field::new(Self::TABLE, "deleted");
    pub const MODIFICATION_DATE: Field = Field::new(Self::TABLE, "modified");

    pub fn new(title: String, now: i64) -> Self {
        Self {
            id: None,
            title,
            due_date: 0,
            hide_until: 0,
            completed: 0,
            deleted: 0,
            created: now,
            modified: now,
            remote_id: new_uuid(),
        }
    }

    pub fn has_due_date(&self) -> bool {
        self.due_date > 0
    }

    pub fn is_completed(&self) -> bool {
        self.completed > 0
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted > 0
    }
}

/// Columns of the task/tag link table
pub mod tag_link {
    use crate::sql::Field;

    pub const TABLE: &str = "tags";
    pub const TASK: Field = Field::new(TABLE, "task");
    pub const TAG_UID: Field = Field::new(TABLE, "tag_uid");
}

/// A user-defined label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagData {
    /// Assigned by the database on first insert
    #[serde(skip)]
    pub id: Option<i64>,
    pub remote_id: Option<String>,
    pub name: Option<String>,
    pub color: Option<i32>,
    /// JSON list of child remote ids, in display order
    pub tag_ordering: Option<String>,
    icon: Option<i32>,
    pub order: i32,
}

impl Default for TagData {
    fn default() -> Self {
        Self {
            id: None,
            remote_id: Some(new_uuid()),
            name: Some(String::new()),
            color: Some(0),
            tag_ordering: Some("[]".to_string()),
            icon: Some(-1),
            order: NO_ORDER,
        }
    }
}

impl TagData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..self }
    }

    pub fn with_id(self, id: i64) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn with_color(self, color: i32) -> Self {
        Self { color: Some(color), ..self }
    }

    pub fn with_icon(self, icon: Option<i32>) -> Self {
        Self { icon, ..self }
    }

    pub fn with_order(self, order: i32) -> Self {
        Self { order, ..self }
    }

    /// Icon to display; the generic label when none is set
    pub fn icon(&self) -> i32 {
        match self.icon {
            Some(icon) if icon >= 0 => icon,
            _ => icons::LABEL,
        }
    }

    /// The icon column exactly as stored
    pub fn stored_icon(&self) -> Option<i32> {
        self.icon
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Child ordering parsed from `tag_ordering`; empty when absent or malformed
    pub fn ordering(&self) -> Vec<String> {
        let Some(ref raw) = self.tag_ordering else {
            return Vec::new();
        };
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(tag = ?self.remote_id, error = %e, "ignoring malformed tag ordering");
            Vec::new()
        })
    }

    pub fn with_ordering(self, ordering: &[String]) -> Self {
        let tag_ordering = serde_json::to_string(ordering).ok();
        Self { tag_ordering, ..self }
    }
}
