use chrono::Local;
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::filter::Filter;
use crate::models::{tag_link, TagData, Task};
use crate::placeholder;
use crate::time::Clock;
use crate::values::{self, ValuesError};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("{0} has not been saved yet")]
    MissingId(&'static str),
    #[error("Invalid default values: {0}")]
    ValuesError(#[from] ValuesError),
}

const TASK_COLUMNS: &str = "tasks._id, tasks.title, tasks.dueDate, tasks.hideUntil, tasks.completed, \
     tasks.deleted, tasks.created, tasks.modified, tasks.remoteId";

const TAG_DATA_COLUMNS: &str = "tagdata._id, tagdata.remoteId, tagdata.name, tagdata.color, \
     tagdata.tagOrdering, tagdata.td_icon, tagdata.td_order";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        debug!(path = %db_path.display(), "opened database");

        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Open a throwaway database that lives only as long as the connection
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                _id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                dueDate     INTEGER NOT NULL DEFAULT 0,
                hideUntil   INTEGER NOT NULL DEFAULT 0,
                completed   INTEGER NOT NULL DEFAULT 0,
                deleted     INTEGER NOT NULL DEFAULT 0,
                created     INTEGER NOT NULL DEFAULT 0,
                modified    INTEGER NOT NULL DEFAULT 0,
                remoteId    TEXT
            );

            CREATE TABLE IF NOT EXISTS tagdata (
                _id         INTEGER PRIMARY KEY AUTOINCREMENT,
                remoteId    TEXT,
                name        TEXT,
                color       INTEGER,
                tagOrdering TEXT,
                td_icon     INTEGER,
                td_order    INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tags (
                _id         INTEGER PRIMARY KEY AUTOINCREMENT,
                task        INTEGER NOT NULL,
                name        TEXT,
                tag_uid     TEXT NOT NULL,
                UNIQUE (task, tag_uid)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(dueDate);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tagdata_remote_id ON tagdata(remoteId);
            CREATE INDEX IF NOT EXISTS idx_tags_task ON tags(task);
            CREATE INDEX IF NOT EXISTS idx_tags_tag_uid ON tags(tag_uid);",
        )?;
        Ok(())
    }

    /// Helper function to map a row to a TagData
    fn row_to_tag_data(row: &rusqlite::Row) -> Result<TagData, rusqlite::Error> {
        let mut tag = TagData::default().with_icon(row.get(5)?).with_id(row.get(0)?);
        tag.remote_id = row.get(1)?;
        tag.name = row.get(2)?;
        tag.color = row.get(3)?;
        tag.tag_ordering = row.get(4)?;
        tag.order = row.get(6)?;
        Ok(tag)
    }

    /// Insert a tag record and return it with its assigned ID
    pub fn insert_tag_data(&self, tag: &TagData) -> Result<TagData, DatabaseError> {
        self.conn.execute(
            "INSERT INTO tagdata (remoteId, name, color, tagOrdering, td_icon, td_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                tag.remote_id,
                tag.name,
                tag.color,
                tag.tag_ordering,
                tag.stored_icon(),
                tag.order,
            ],
        )?;
        let saved = tag.clone().with_id(self.conn.last_insert_rowid());
        info!(id = ?saved.id, name = saved.display_name(), "created tag");
        Ok(saved)
    }

    /// Replace an existing tag record
    pub fn update_tag_data(&self, tag: &TagData) -> Result<(), DatabaseError> {
        let id = tag.id.ok_or(DatabaseError::MissingId("tag"))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE tagdata SET remoteId = ?1, name = ?2, color = ?3, tagOrdering = ?4,
             td_icon = ?5, td_order = ?6 WHERE _id = ?7",
            rusqlite::params![
                tag.remote_id,
                tag.name,
                tag.color,
                tag.tag_ordering,
                tag.stored_icon(),
                tag.order,
                id
            ],
        )?;
        // Keep denormalized names on links in step
        tx.execute(
            "UPDATE tags SET name = ?1 WHERE tag_uid = ?2",
            rusqlite::params![tag.name, tag.remote_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a tag record and detach it from every task
    pub fn delete_tag_data(&self, tag: &TagData) -> Result<(), DatabaseError> {
        let id = tag.id.ok_or(DatabaseError::MissingId("tag"))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM tags WHERE tag_uid = ?1", rusqlite::params![tag.remote_id])?;
        tx.execute("DELETE FROM tagdata WHERE _id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        info!(id, name = tag.display_name(), "deleted tag");
        Ok(())
    }

    /// Get a single tag record by ID
    pub fn get_tag_data(&self, id: i64) -> Result<TagData, DatabaseError> {
        self.conn
            .query_row(
                &format!("SELECT {TAG_DATA_COLUMNS} FROM tagdata WHERE _id = ?1"),
                rusqlite::params![id],
                Self::row_to_tag_data,
            )
            .map_err(DatabaseError::from)
    }

    pub fn get_tag_data_by_remote_id(&self, remote_id: &str) -> Result<Option<TagData>, DatabaseError> {
        let tag = self
            .conn
            .query_row(
                &format!("SELECT {TAG_DATA_COLUMNS} FROM tagdata WHERE remoteId = ?1"),
                rusqlite::params![remote_id],
                Self::row_to_tag_data,
            )
            .optional()?;
        Ok(tag)
    }

    /// Case-insensitive lookup by display name
    pub fn get_tag_data_by_name(&self, name: &str) -> Result<Option<TagData>, DatabaseError> {
        let tag = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TAG_DATA_COLUMNS} FROM tagdata WHERE name = ?1 COLLATE NOCASE
                     ORDER BY _id ASC LIMIT 1"
                ),
                rusqlite::params![name],
                Self::row_to_tag_data,
            )
            .optional()?;
        Ok(tag)
    }

    /// All tag records, manually ordered ones first, then by name
    pub fn get_all_tag_data(&self) -> Result<Vec<TagData>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TAG_DATA_COLUMNS} FROM tagdata
             ORDER BY CASE WHEN td_order < 0 THEN 1 ELSE 0 END, td_order ASC, name COLLATE NOCASE ASC"
        ))?;
        let tags = stmt
            .query_map([], Self::row_to_tag_data)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Helper function to map a row to a Task
    fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
        Ok(Task {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            due_date: row.get(2)?,
            hide_until: row.get(3)?,
            completed: row.get(4)?,
            deleted: row.get(5)?,
            created: row.get(6)?,
            modified: row.get(7)?,
            remote_id: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        })
    }

    /// Insert a task into the database and return its ID
    pub fn insert_task(&self, task: &Task) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO tasks (title, dueDate, hideUntil, completed, deleted, created, modified, remoteId)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                task.title,
                task.due_date,
                task.hide_until,
                task.completed,
                task.deleted,
                task.created,
                task.modified,
                task.remote_id
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a single task by ID
    pub fn get_task(&self, id: i64) -> Result<Task, DatabaseError> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE _id = ?1"),
                rusqlite::params![id],
                Self::row_to_task,
            )
            .map_err(DatabaseError::from)
    }

    /// Update an existing task
    pub fn update_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let id = task.id.ok_or(DatabaseError::MissingId("task"))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE tasks SET title = ?1, dueDate = ?2, hideUntil = ?3, completed = ?4,
             deleted = ?5, modified = ?6, remoteId = ?7 WHERE _id = ?8",
            rusqlite::params![
                task.title,
                task.due_date,
                task.hide_until,
                task.completed,
                task.deleted,
                task.modified,
                task.remote_id,
                id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a task by ID, along with its tag links
    pub fn delete_task(&self, id: i64) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM tags WHERE task = ?1", rusqlite::params![id])?;
        tx.execute("DELETE FROM tasks WHERE _id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Attach a saved tag to a task; linking twice is a no-op
    pub fn link_tag(&self, task_id: i64, tag: &TagData) -> Result<(), DatabaseError> {
        let uid = tag.remote_id.as_deref().ok_or(DatabaseError::MissingId("tag remote id"))?;
        self.conn.execute(
            "INSERT OR IGNORE INTO tags (task, name, tag_uid) VALUES (?1, ?2, ?3)",
            rusqlite::params![task_id, tag.name, uid],
        )?;
        Ok(())
    }

    pub fn get_tags_for_task(&self, task_id: i64) -> Result<Vec<TagData>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TAG_DATA_COLUMNS} FROM tagdata
             INNER JOIN tags ON tags.tag_uid = tagdata.remoteId
             WHERE tags.task = ?1 ORDER BY tagdata.name COLLATE NOCASE ASC"
        ))?;
        let tags = stmt
            .query_map(rusqlite::params![task_id], Self::row_to_tag_data)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Run a filter's query, resolving its time placeholders against one
    /// reading of `clock`
    pub fn query_tasks(&self, filter: &Filter, clock: &Clock) -> Result<Vec<Task>, DatabaseError> {
        let now = clock.now();
        let tail = placeholder::replace_for_query(&filter.sql(), now, &Local);
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks {tail}");
        debug!(filter = %filter, %query, "querying tasks");

        let mut stmt = self.conn.prepare(&query)?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Record to save for a tag uid that has no row yet. The filter's own
    /// tag keeps its name and colour; anything else gets a bare record.
    fn tag_for_uid(filter: &Filter, uid: String) -> TagData {
        match filter {
            Filter::Tag(f) if f.tag.remote_id.as_deref() == Some(uid.as_str()) => f.tag.clone(),
            _ => {
                let mut tag = TagData::default();
                tag.remote_id = Some(uid);
                tag
            }
        }
    }

    /// Create a task inside `filter`'s list, pre-filled with the filter's
    /// default values resolved at the current instant
    pub fn create_task_in_filter(
        &self,
        filter: &Filter,
        title: String,
        clock: &Clock,
    ) -> Result<Task, DatabaseError> {
        let now = clock.now();
        let defaults = values::deserialize_map(&filter.values_for_new_tasks())?;

        let mut task = Task::new(title, now);
        let mut tag_uids = Vec::new();
        for (key, value) in &defaults {
            match key.as_str() {
                k if k == Task::DUE_DATE.name() => {
                    task.due_date = value.as_millis(now, &Local).unwrap_or(0);
                }
                k if k == Task::HIDE_UNTIL.name() => {
                    task.hide_until = value.as_millis(now, &Local).unwrap_or(0);
                }
                k if k == tag_link::TAG_UID.name() => match value.as_text() {
                    Some(uid) if !uid.is_empty() => tag_uids.push(uid.to_string()),
                    _ => warn!(key = k, ?value, "ignoring empty tag default"),
                },
                other => warn!(key = other, "ignoring unsupported default value"),
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let id = self.insert_task(&task)?;
        for uid in tag_uids {
            let tag = match self.get_tag_data_by_remote_id(&uid)? {
                Some(tag) => tag,
                None => self.insert_tag_data(&Self::tag_for_uid(filter, uid))?,
            };
            self.link_tag(id, &tag)?;
        }
        tx.commit()?;

        task.id = Some(id);
        info!(id, filter = %filter, due = task.due_date, "created task");
        Ok(task)
    }
}
