//! SQLite-backed metadata catalog: projects, source files, and generated
//! documentation records.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::{Result, StoreError};

#[derive(Debug)]
pub struct Catalog {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub file_count: i64,
    pub chunk_count: i64,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    pub id: String,
    pub project_id: String,
    pub file_path: String,
    pub language: String,
    pub chunk_count: i64,
    pub indexed_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRecord {
    pub id: String,
    pub project_id: String,
    pub file_path: String,
    pub target: String,
    pub content: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub context_chunks: i64,
    pub generated_at: String,
}

impl Catalog {
    /// Open (or create) the catalog database and run migrations.
    ///
    /// Enables foreign key constraints at connection level so that
    /// `ON DELETE CASCADE` rules are enforced.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::Sqlite)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Expose the underlying pool for shared access.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a project in `processing` state and return its record.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_project(&self, name: &str) -> Result<ProjectRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO projects (id, name) VALUES (?, ?)")
            .bind(&id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        self.get_project(&id)
            .await?
            .ok_or_else(|| StoreError::Other(format!("project {id} vanished after insert")))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_project(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, ProjectRecord>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Mark a project completed with final counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn complete_project(
        &self,
        id: &str,
        file_count: i64,
        chunk_count: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE projects SET status = 'completed', file_count = ?, chunk_count = ?, \
             completed_at = datetime('now') WHERE id = ?",
        )
        .bind(file_count)
        .bind(chunk_count)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a project and, via cascade, its files and documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete_project(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Register an indexed source file and return its record.
    ///
    /// Re-registering the same path within a project replaces the old row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_file(
        &self,
        project_id: &str,
        file_path: &str,
        language: &str,
        chunk_count: i64,
    ) -> Result<FileRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT OR REPLACE INTO files (id, project_id, file_path, language, chunk_count) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(project_id)
        .bind(file_path)
        .bind(language)
        .bind(chunk_count)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// List all files indexed under a project, in path order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_files(&self, project_id: &str) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE project_id = ? ORDER BY file_path ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Look up a single file by project and path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_file(&self, project_id: &str, file_path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE project_id = ? AND file_path = ?",
        )
        .bind(project_id)
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Persist a generated documentation record.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn save_document(&self, doc: &DocumentRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents \
             (id, project_id, file_path, target, content, prompt_tokens, completion_tokens, \
              context_chunks, generated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&doc.id)
        .bind(&doc.project_id)
        .bind(&doc.file_path)
        .bind(&doc.target)
        .bind(&doc.content)
        .bind(doc.prompt_tokens)
        .bind(doc.completion_tokens)
        .bind(doc.context_chunks)
        .bind(&doc.generated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query_as::<_, DocumentRecord>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
