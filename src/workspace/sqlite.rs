// src/workspace/sqlite.rs

//! SQLite-backed workspace store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::workspace::store::WorkspaceStore;
use crate::workspace::{
    ChatTurn, Domain, FileChanges, Note, NoteChanges, NoteDraft, Project, ProjectChanges,
    StoredFile, Task, TaskChanges, TaskDraft,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        domain TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_user_domain
        ON projects(user_id, domain)",
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        priority TEXT NOT NULL DEFAULT 'medium',
        due_date TEXT,
        due_time TEXT,
        all_day INTEGER NOT NULL DEFAULT 1,
        done INTEGER NOT NULL DEFAULT 0,
        project_id TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notes (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        project_id TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS files (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        project_id TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chat_turns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        awaiting_response INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
];

pub struct SqliteWorkspaceStore {
    pool: SqlitePool,
}

impl SqliteWorkspaceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Write path for the external upload collaborator. Files never enter
    /// the workspace through the proposal pipeline.
    pub async fn insert_file(
        &self,
        user_id: &str,
        name: &str,
        project_id: Option<&str>,
    ) -> Result<StoredFile, StoreError> {
        let file = StoredFile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            project_id: project_id.map(|p| p.to_string()),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO files (id, user_id, name, project_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(user_id)
        .bind(&file.name)
        .bind(&file.project_id)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;
        Ok(file)
    }

    async fn fetch_task(&self, user_id: &str, id: &str) -> Result<Task, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("task", id))?;
        task_from_row(&row)
    }

    async fn fetch_note(&self, user_id: &str, id: &str) -> Result<Note, StoreError> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("note", id))?;
        note_from_row(&row)
    }

    async fn fetch_project(&self, user_id: &str, id: &str) -> Result<Project, StoreError> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("project", id))?;
        project_from_row(&row)
    }

    async fn fetch_file(&self, user_id: &str, id: &str) -> Result<StoredFile, StoreError> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("file", id))?;
        file_from_row(&row)
    }
}

#[async_trait]
impl WorkspaceStore for SqliteWorkspaceStore {
    async fn ensure_domains(&self, user_id: &str) -> Result<(), StoreError> {
        for domain in Domain::ALL {
            sqlx::query(
                "INSERT OR IGNORE INTO projects (id, user_id, name, description, domain, created_at)
                 VALUES (?, ?, ?, '', ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(domain.as_str())
            .bind(domain.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn create_task(&self, user_id: &str, draft: &TaskDraft) -> Result<Task, StoreError> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            priority: draft.priority,
            due_date: draft.due_date,
            due_time: draft.due_time,
            all_day: draft.all_day,
            done: false,
            project_id: draft.project_id.clone(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, priority, due_date, due_time, all_day, done, project_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(user_id)
        .bind(&task.title)
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.due_time)
        .bind(task.all_day)
        .bind(task.done)
        .bind(&task.project_id)
        .bind(task.created_at)
        .execute(&self.pool)
        .await?;
        Ok(task)
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<Task, StoreError> {
        let mut task = self.fetch_task(user_id, id).await?;

        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(date) = changes.due_date {
            task.due_date = Some(date);
        }
        if let Some(time) = changes.due_time {
            task.due_time = Some(time);
            task.all_day = false;
        }
        if let Some(all_day) = changes.all_day {
            task.all_day = all_day;
        }
        if let Some(done) = changes.done {
            task.done = done;
        }
        if let Some(project_id) = &changes.project_id {
            task.project_id = Some(project_id.clone());
        }

        sqlx::query(
            "UPDATE tasks SET title = ?, priority = ?, due_date = ?, due_time = ?, all_day = ?, done = ?, project_id = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(&task.title)
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.due_time)
        .bind(task.all_day)
        .bind(task.done)
        .bind(&task.project_id)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("task", id));
        }
        Ok(())
    }

    async fn create_note(&self, user_id: &str, draft: &NoteDraft) -> Result<Note, StoreError> {
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            project_id: draft.project_id.clone(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO notes (id, user_id, title, content, project_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&note.id)
        .bind(user_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.project_id)
        .bind(note.created_at)
        .execute(&self.pool)
        .await?;
        Ok(note)
    }

    async fn update_note(
        &self,
        user_id: &str,
        id: &str,
        changes: &NoteChanges,
    ) -> Result<Note, StoreError> {
        let mut note = self.fetch_note(user_id, id).await?;

        if let Some(title) = &changes.title {
            note.title = title.clone();
        }
        if let Some(project_id) = &changes.project_id {
            note.project_id = Some(project_id.clone());
        }

        sqlx::query("UPDATE notes SET title = ?, project_id = ? WHERE id = ? AND user_id = ?")
            .bind(&note.title)
            .bind(&note.project_id)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(note)
    }

    async fn delete_note(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("note", id));
        }
        Ok(())
    }

    async fn update_project(
        &self,
        user_id: &str,
        id: &str,
        changes: &ProjectChanges,
    ) -> Result<Project, StoreError> {
        let mut project = self.fetch_project(user_id, id).await?;
        project.description = changes.description.clone();

        sqlx::query("UPDATE projects SET description = ? WHERE id = ? AND user_id = ?")
            .bind(&project.description)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(project)
    }

    async fn update_file(
        &self,
        user_id: &str,
        id: &str,
        changes: &FileChanges,
    ) -> Result<StoredFile, StoreError> {
        let mut file = self.fetch_file(user_id, id).await?;
        file.project_id = Some(changes.project_id.clone());

        sqlx::query("UPDATE files SET project_id = ? WHERE id = ? AND user_id = ?")
            .bind(&file.project_id)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(file)
    }

    async fn delete_file(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("file", id));
        }
        Ok(())
    }

    async fn query_tasks(&self, user_id: &str, limit: usize) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE user_id = ? ORDER BY created_at DESC, id LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn query_notes(&self, user_id: &str, limit: usize) -> Result<Vec<Note>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM notes WHERE user_id = ? ORDER BY created_at DESC, id LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(note_from_row).collect()
    }

    async fn query_projects(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query("SELECT * FROM projects WHERE user_id = ? ORDER BY name LIMIT ?")
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(project_from_row).collect()
    }

    async fn query_files(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredFile>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM files WHERE user_id = ? ORDER BY created_at DESC, id LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(file_from_row).collect()
    }

    async fn append_turn(
        &self,
        user_id: &str,
        role: &str,
        content: &str,
        awaiting: bool,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO chat_turns (user_id, role, content, awaiting_response, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(role)
        .bind(content)
        .bind(awaiting)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn resolve_turn(&self, turn_id: i64, content: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE chat_turns SET content = ?, awaiting_response = 0 WHERE id = ?",
        )
        .bind(content)
        .bind(turn_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("turn", &turn_id.to_string()));
        }
        Ok(())
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, StoreError> {
        let rows = sqlx::query("SELECT * FROM chat_turns WHERE user_id = ? ORDER BY id DESC LIMIT ?")
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        let mut turns: Vec<ChatTurn> = rows
            .iter()
            .map(turn_from_row)
            .collect::<Result<_, _>>()?;
        turns.reverse();
        Ok(turns)
    }
}

// ── Row mapping ───────────────────────────────────────────────────────

fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        priority: row
            .try_get::<String, _>("priority")?
            .parse()
            .unwrap_or_default(),
        due_date: row.try_get("due_date")?,
        due_time: row.try_get("due_time")?,
        all_day: row.try_get("all_day")?,
        done: row.try_get("done")?,
        project_id: row.try_get("project_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn note_from_row(row: &SqliteRow) -> Result<Note, StoreError> {
    Ok(Note {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        project_id: row.try_get("project_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn project_from_row(row: &SqliteRow) -> Result<Project, StoreError> {
    let raw: String = row.try_get("domain")?;
    let domain = Domain::from_name(&raw).ok_or_else(|| {
        StoreError::Backend(sqlx::Error::ColumnDecode {
            index: "domain".to_string(),
            source: format!("unknown domain '{}'", raw).into(),
        })
    })?;
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        domain,
        created_at: row.try_get("created_at")?,
    })
}

fn file_from_row(row: &SqliteRow) -> Result<StoredFile, StoreError> {
    Ok(StoredFile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        project_id: row.try_get("project_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn turn_from_row(row: &SqliteRow) -> Result<ChatTurn, StoreError> {
    Ok(ChatTurn {
        id: row.try_get("id")?,
        role: row.try_get("role")?,
        content: row.try_get("content")?,
        awaiting_response: row.try_get("awaiting_response")?,
        created_at: row.try_get("created_at")?,
    })
}
