pub mod queries;

use crate::error::UserError;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRow {
    pub id: i64,
    pub name: String,
    pub stored_path: PathBuf,
    pub category_id: Option<i64>,
    /// `None` both for uncategorized documents and for dangling references.
    pub category: Option<String>,
    pub keywords: String,
    pub accessed_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub name: &'a str,
    pub stored_path: &'a Path,
    pub category: Option<&'a str>,
    pub keywords: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilter<'a> {
    pub category: Option<&'a str>,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub documents: i64,
    pub categories: i64,
    pub orphaned_documents: i64,
    pub last_accessed_at: Option<i64>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite DB")?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")
            .context("Failed to configure foreign key enforcement")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    /// Creates missing tables and re-inserts any seeded category that is absent.
    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })?;

        let now = Utc::now().timestamp_millis();
        let seeded = queries::SEED_CATEGORIES
            .iter()
            .map(|name| {
                self.conn
                    .execute(queries::SEED_CATEGORY, params![name, now])
                    .with_context(|| format!("Failed to seed category: {name}"))
            })
            .sum::<Result<usize>>()?;

        if seeded > 0 {
            info!(seeded, "seeded default categories");
        }

        Ok(())
    }

    pub fn search_documents(
        &self,
        query: &str,
        filter: &SearchFilter<'_>,
    ) -> Result<Vec<DocumentRow>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{query}%");
        let limit = filter.limit.map_or(-1, sql_count);
        let mut statement = self.conn.prepare(&format!(
            "SELECT {}
             WHERE (d.name LIKE ?1 OR d.keywords LIKE ?1)
               AND (?2 IS NULL OR c.name = ?2)
             ORDER BY d.accessed_at DESC, d.id DESC
             LIMIT ?3 OFFSET ?4",
            queries::DOCUMENT_COLUMNS
        ))?;

        let rows = statement
            .query_map(
                params![pattern, filter.category, limit, sql_count(filter.offset)],
                document_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to search documents")?;

        debug!(query, hits = rows.len(), "document search");
        Ok(rows)
    }

    pub fn recent_documents(&self, limit: usize) -> Result<Vec<DocumentRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {}
             ORDER BY d.accessed_at DESC, d.id DESC
             LIMIT ?1",
            queries::DOCUMENT_COLUMNS
        ))?;

        let rows = statement
            .query_map(params![sql_count(limit)], document_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list recent documents")?;

        Ok(rows)
    }

    pub fn documents_in_category(&self, category: &str) -> Result<Vec<DocumentRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {}
             WHERE c.name = ?1
             ORDER BY d.accessed_at DESC, d.id DESC",
            queries::DOCUMENT_COLUMNS
        ))?;

        let rows = statement
            .query_map(params![category.trim()], document_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list documents by category")?;

        Ok(rows)
    }

    pub fn document(&self, id: i64) -> Result<Option<DocumentRow>> {
        self.conn
            .query_row(
                &format!("SELECT {} WHERE d.id = ?1", queries::DOCUMENT_COLUMNS),
                params![id],
                document_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to load document {id}"))
    }

    pub fn insert_document(&self, new: &NewDocument<'_>) -> Result<DocumentRow> {
        let category_id = match new
            .category
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            Some(name) => {
                let id = self.category_id(name)?;
                if id.is_none() {
                    warn!(category = name, "unknown category, storing document without one");
                }
                id
            }
            None => None,
        };

        let accessed_at = self.next_access_stamp()?;
        self.conn
            .execute(
                "INSERT INTO documents (name, stored_path, category_id, keywords, accessed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.name,
                    new.stored_path.to_string_lossy().into_owned(),
                    category_id,
                    new.keywords,
                    accessed_at
                ],
            )
            .context("Failed to insert document")?;

        let id = self.conn.last_insert_rowid();
        self.document(id)?
            .with_context(|| format!("Inserted document {id} could not be read back"))
    }

    /// Marks a document as accessed now; it becomes the most recent one.
    pub fn touch_document(&self, id: i64) -> Result<DocumentRow> {
        let accessed_at = self.next_access_stamp()?;
        let updated = self
            .conn
            .execute(
                "UPDATE documents SET accessed_at = ?1 WHERE id = ?2",
                params![accessed_at, id],
            )
            .with_context(|| format!("Failed to update access time of document {id}"))?;

        if updated == 0 {
            return Err(UserError::DocumentNotFound(id).into());
        }

        self.document(id)?
            .ok_or_else(|| UserError::DocumentNotFound(id).into())
    }

    pub fn stored_paths(&self) -> Result<Vec<(i64, PathBuf)>> {
        let mut statement = self
            .conn
            .prepare("SELECT id, stored_path FROM documents ORDER BY id ASC")?;

        let rows = statement
            .query_map([], |row| {
                Ok((row.get(0)?, PathBuf::from(row.get::<_, String>(1)?)))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list stored paths")?;

        Ok(rows)
    }

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        let mut statement = self
            .conn
            .prepare("SELECT id, name, created_at FROM categories ORDER BY name ASC")?;

        let rows = statement
            .query_map([], |row| {
                Ok(CategoryRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list categories")?;

        Ok(rows)
    }

    pub fn category_id(&self, name: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to look up category: {name}"))
    }

    pub fn add_category(&self, name: &str) -> Result<CategoryRow> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UserError::EmptyField("category name").into());
        }

        let created_at = Utc::now().timestamp_millis();
        match self.conn.execute(
            "INSERT INTO categories (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(error, _))
                if error.code == ErrorCode::ConstraintViolation =>
            {
                return Err(UserError::DuplicateCategory(name.to_string()).into());
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Failed to add category: {name}"));
            }
        }

        info!(category = name, "category added");
        Ok(CategoryRow {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    /// Deletes by name without touching documents that reference it.
    pub fn delete_category(&self, name: &str) -> Result<usize> {
        let name = name.trim();
        let deleted = self
            .conn
            .execute("DELETE FROM categories WHERE name = ?1", params![name])
            .with_context(|| format!("Failed to delete category: {name}"))?;

        info!(category = name, deleted, "category deleted");
        Ok(deleted)
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        self.conn
            .query_row(
                "SELECT
                   (SELECT COUNT(*) FROM documents),
                   (SELECT COUNT(*) FROM categories),
                   (SELECT COUNT(*) FROM documents d
                     WHERE d.category_id IS NOT NULL
                       AND NOT EXISTS (SELECT 1 FROM categories c WHERE c.id = d.category_id)),
                   (SELECT MAX(accessed_at) FROM documents)",
                [],
                |row| {
                    Ok(CatalogStats {
                        documents: row.get(0)?,
                        categories: row.get(1)?,
                        orphaned_documents: row.get(2)?,
                        last_accessed_at: row.get(3)?,
                    })
                },
            )
            .context("Failed to compute catalog stats")
    }

    fn next_access_stamp(&self) -> Result<i64> {
        self.conn
            .query_row(
                queries::NEXT_ACCESS_STAMP,
                params![Utc::now().timestamp_millis()],
                |row| row.get(0),
            )
            .context("Failed to compute access timestamp")
    }
}

/// SQLite reads a negative LIMIT as "no limit", so oversized counts saturate
/// instead of wrapping.
fn sql_count(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        stored_path: PathBuf::from(row.get::<_, String>(2)?),
        category_id: row.get(3)?,
        category: row.get(4)?,
        keywords: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        accessed_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{Database, NewDocument, SearchFilter, queries};
    use crate::error::{UserError, find_user_error};
    use std::path::Path;
    use tempfile::tempdir;

    fn insert(database: &Database, name: &str, category: Option<&str>, keywords: &str) -> i64 {
        let stored = format!("data/files/{name}.pdf");
        database
            .insert_document(&NewDocument {
                name,
                stored_path: Path::new(&stored),
                category,
                keywords,
            })
            .expect("document inserted")
            .id
    }

    fn names(rows: &[super::DocumentRow]) -> Vec<&str> {
        rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn fresh_database_has_seeded_categories_and_no_documents() {
        let database = Database::open_in_memory().expect("database");

        let mut categories = database
            .list_categories()
            .expect("categories")
            .into_iter()
            .map(|category| category.name)
            .collect::<Vec<_>>();
        categories.sort();
        let mut expected = queries::SEED_CATEGORIES.map(str::to_string).to_vec();
        expected.sort();

        assert_eq!(categories, expected);
        assert!(database.recent_documents(20).expect("recent").is_empty());
        assert_eq!(database.stats().expect("stats").documents, 0);
    }

    #[test]
    fn reopening_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("catalog.db");

        let first = Database::open(&path).expect("first open");
        insert(&first, "Contrato", Some("Cível"), "aluguel");
        drop(first);

        let second = Database::open(&path).expect("second open");
        assert_eq!(second.list_categories().expect("categories").len(), 5);
        assert_eq!(second.stats().expect("stats").documents, 1);
    }

    #[test]
    fn search_matches_name_or_keywords() {
        let database = Database::open_in_memory().expect("database");
        insert(&database, "Petição inicial", Some("Trabalhista"), "horas extras");
        insert(&database, "Recurso", Some("Criminal"), "habeas corpus");

        let by_name = database
            .search_documents("inicial", &SearchFilter::default())
            .expect("search by name");
        assert_eq!(names(&by_name), vec!["Petição inicial"]);

        let by_keyword = database
            .search_documents("corpus", &SearchFilter::default())
            .expect("search by keyword");
        assert_eq!(names(&by_keyword), vec!["Recurso"]);
        assert_eq!(by_keyword[0].category.as_deref(), Some("Criminal"));

        let nothing = database
            .search_documents("divórcio", &SearchFilter::default())
            .expect("search miss");
        assert!(nothing.is_empty());
    }

    #[test]
    fn blank_query_returns_nothing() {
        let database = Database::open_in_memory().expect("database");
        insert(&database, "Contrato", None, "");

        let rows = database
            .search_documents("   ", &SearchFilter::default())
            .expect("blank search");
        assert!(rows.is_empty());
    }

    #[test]
    fn search_filter_narrows_by_category_and_pages() {
        let database = Database::open_in_memory().expect("database");
        insert(&database, "Contrato A", Some("Cível"), "");
        insert(&database, "Contrato B", Some("Família"), "");
        insert(&database, "Contrato C", Some("Cível"), "");

        let civil = database
            .search_documents(
                "Contrato",
                &SearchFilter {
                    category: Some("Cível"),
                    ..SearchFilter::default()
                },
            )
            .expect("filtered search");
        assert_eq!(names(&civil), vec!["Contrato C", "Contrato A"]);

        let second_page = database
            .search_documents(
                "Contrato",
                &SearchFilter {
                    category: None,
                    limit: Some(1),
                    offset: 1,
                },
            )
            .expect("paged search");
        assert_eq!(names(&second_page), vec!["Contrato B"]);
    }

    #[test]
    fn recent_list_is_newest_first_and_limited() {
        let database = Database::open_in_memory().expect("database");
        (0..25).for_each(|index| {
            insert(&database, &format!("Doc {index}"), None, "");
        });

        let recent = database.recent_documents(20).expect("recent");
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].name, "Doc 24");
        assert!(
            recent
                .windows(2)
                .all(|pair| pair[0].accessed_at > pair[1].accessed_at)
        );
    }

    #[test]
    fn touching_moves_document_to_front() {
        let database = Database::open_in_memory().expect("database");
        let first = insert(&database, "Primeiro", None, "");
        insert(&database, "Segundo", None, "");

        let before = database.document(first).expect("lookup").expect("exists");
        let touched = database.touch_document(first).expect("touch");

        assert!(touched.accessed_at > before.accessed_at);
        let recent = database.recent_documents(20).expect("recent");
        assert_eq!(recent[0].id, first);
    }

    #[test]
    fn touching_unknown_document_is_user_error() {
        let database = Database::open_in_memory().expect("database");
        let error = database.touch_document(42).expect_err("missing");

        assert!(matches!(
            find_user_error(&error),
            Some(UserError::DocumentNotFound(42))
        ));
    }

    #[test]
    fn unknown_category_is_stored_as_null() {
        let database = Database::open_in_memory().expect("database");
        let id = insert(&database, "Parecer", Some("Ambiental"), "");
        let row = database.document(id).expect("lookup").expect("exists");

        assert_eq!(row.category_id, None);
        assert_eq!(row.category, None);
    }

    #[test]
    fn duplicate_category_is_rejected_without_changes() {
        let database = Database::open_in_memory().expect("database");
        let before = database.list_categories().expect("categories").len();

        let error = database.add_category(" Criminal ").expect_err("duplicate");
        assert!(matches!(
            find_user_error(&error),
            Some(UserError::DuplicateCategory(name)) if name == "Criminal"
        ));
        assert_eq!(database.list_categories().expect("categories").len(), before);

        database.add_category("Previdenciário").expect("new category");
        assert_eq!(
            database.list_categories().expect("categories").len(),
            before + 1
        );
    }

    #[test]
    fn empty_category_name_is_rejected() {
        let database = Database::open_in_memory().expect("database");
        let error = database.add_category("  ").expect_err("empty");

        assert!(matches!(
            find_user_error(&error),
            Some(UserError::EmptyField(_))
        ));
    }

    #[test]
    fn deleting_referenced_category_leaves_dangling_reference() {
        let database = Database::open_in_memory().expect("database");
        let family_id = database
            .category_id("Família")
            .expect("lookup")
            .expect("seeded");
        let doc = insert(&database, "Guarda", Some("Família"), "");

        assert_eq!(database.delete_category("Família").expect("delete"), 1);

        let row = database.document(doc).expect("lookup").expect("exists");
        assert_eq!(row.category_id, Some(family_id));
        assert_eq!(row.category, None);
        assert!(database.category_id("Família").expect("lookup").is_none());
        assert_eq!(database.stats().expect("stats").orphaned_documents, 1);
    }

    #[test]
    fn delete_trims_the_name_like_add() {
        let database = Database::open_in_memory().expect("database");
        database
            .add_category(" Previdenciário ")
            .expect("category added");

        assert_eq!(
            database
                .delete_category(" Previdenciário ")
                .expect("delete"),
            1
        );
        assert!(
            database
                .category_id("Previdenciário")
                .expect("lookup")
                .is_none()
        );
    }

    #[test]
    fn oversized_limits_do_not_wrap_to_unlimited() {
        assert_eq!(super::sql_count(usize::MAX), i64::MAX);
        assert_eq!(super::sql_count(20), 20);

        let database = Database::open_in_memory().expect("database");
        (0..3).for_each(|index| {
            insert(&database, &format!("Doc {index}"), None, "");
        });

        assert_eq!(database.recent_documents(usize::MAX).expect("recent").len(), 3);
        let rows = database
            .search_documents(
                "Doc",
                &SearchFilter {
                    category: None,
                    limit: Some(usize::MAX),
                    offset: usize::MAX,
                },
            )
            .expect("search");
        assert!(rows.is_empty());
    }

    #[test]
    fn deleting_missing_category_is_a_no_op() {
        let database = Database::open_in_memory().expect("database");
        assert_eq!(database.delete_category("Inexistente").expect("delete"), 0);
        assert_eq!(database.list_categories().expect("categories").len(), 5);
    }

    #[test]
    fn deleted_seed_category_returns_on_next_open() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("catalog.db");

        let database = Database::open(&path).expect("open");
        database.delete_category("Tributário").expect("delete");
        assert_eq!(database.list_categories().expect("categories").len(), 4);
        drop(database);

        let reopened = Database::open(&path).expect("reopen");
        assert!(reopened.category_id("Tributário").expect("lookup").is_some());
    }

    #[test]
    fn documents_in_category_lists_only_that_category() {
        let database = Database::open_in_memory().expect("database");
        insert(&database, "Denúncia", Some("Criminal"), "");
        insert(&database, "Inventário", Some("Família"), "");

        let rows = database.documents_in_category("Criminal").expect("list");
        assert_eq!(names(&rows), vec!["Denúncia"]);
    }
}
