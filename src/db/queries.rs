pub const SEED_CATEGORIES: [&str; 5] = ["Criminal", "Cível", "Trabalhista", "Tributário", "Família"];

pub const CREATE_CATEGORIES: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
  id         INTEGER PRIMARY KEY,
  name       TEXT NOT NULL UNIQUE,
  created_at INTEGER NOT NULL
);
"#;

// category_id is declared as a foreign key but never enforced: deleting a
// category leaves the reference dangling.
pub const CREATE_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
  id          INTEGER PRIMARY KEY,
  name        TEXT NOT NULL,
  stored_path TEXT NOT NULL,
  category_id INTEGER,
  keywords    TEXT,
  accessed_at INTEGER NOT NULL,
  FOREIGN KEY (category_id) REFERENCES categories (id)
);
"#;

pub const INDEX_DOCUMENTS_ACCESSED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_accessed_at ON documents(accessed_at);";

pub const INDEX_DOCUMENTS_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_category_id ON documents(category_id);";

pub const SEED_CATEGORY: &str =
    "INSERT OR IGNORE INTO categories (name, created_at) VALUES (?1, ?2)";

pub const DOCUMENT_COLUMNS: &str = "d.id, d.name, d.stored_path, d.category_id, c.name, d.keywords, d.accessed_at
     FROM documents d
     LEFT JOIN categories c ON d.category_id = c.id";

pub const NEXT_ACCESS_STAMP: &str =
    "SELECT MAX(?1, COALESCE(MAX(accessed_at) + 1, 0)) FROM documents";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_CATEGORIES,
        CREATE_DOCUMENTS,
        INDEX_DOCUMENTS_ACCESSED_AT,
        INDEX_DOCUMENTS_CATEGORY,
    ]
}
