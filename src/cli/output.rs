use crate::db::{CategoryRow, DocumentRow};
use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use serde::Serialize;
use std::path::Path;
use url::Url;

const UNCATEGORIZED: &str = "No category";

#[derive(Debug, Serialize)]
pub struct DocumentDetail<'a> {
    #[serde(flatten)]
    pub document: &'a DocumentRow,
    pub uri: String,
    pub mime_type: String,
    pub file_exists: bool,
}

impl<'a> DocumentDetail<'a> {
    pub fn new(document: &'a DocumentRow) -> Self {
        Self {
            document,
            uri: file_uri(&document.stored_path),
            mime_type: mime_guess::from_path(&document.stored_path)
                .first_or_octet_stream()
                .to_string(),
            file_exists: document.stored_path.exists(),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{content}");
    Ok(())
}

pub fn print_documents(documents: &[DocumentRow], empty_message: &str) {
    if documents.is_empty() {
        println!("{empty_message}");
        return;
    }

    println!(
        "{:>5}  {:<36}  {:<14}  {:<19}  {}",
        "ID", "NAME", "CATEGORY", "LAST ACCESS", "KEYWORDS"
    );
    documents.iter().for_each(|document| {
        println!(
            "{:>5}  {:<36}  {:<14}  {:<19}  {}",
            document.id,
            truncate(&document.name, 36),
            truncate(category_label(document), 14),
            format_timestamp(document.accessed_at),
            document.keywords
        );
    });
}

pub fn print_document_detail(detail: &DocumentDetail<'_>) {
    let document = detail.document;
    println!("Document #{}", document.id);
    println!("- name: {}", document.name);
    println!("- category: {}", category_label(document));
    println!(
        "- keywords: {}",
        if document.keywords.is_empty() {
            "-"
        } else {
            document.keywords.as_str()
        }
    );
    println!("- last_access: {}", format_timestamp(document.accessed_at));
    println!("- stored_path: {}", document.stored_path.display());
    println!("- uri: {}", detail.uri);
    println!("- type: {}", detail.mime_type);
    println!("- file_exists: {}", detail.file_exists);
}

pub fn print_categories(categories: &[CategoryRow]) {
    if categories.is_empty() {
        println!("No categories");
        return;
    }

    categories.iter().for_each(|category| {
        println!(
            "{:>5}  {:<24}  created {}",
            category.id,
            category.name,
            format_timestamp(category.created_at)
        );
    });
}

pub fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn category_label(document: &DocumentRow) -> &str {
    match (&document.category, document.category_id) {
        (Some(name), _) => name.as_str(),
        (None, Some(_)) => "(deleted)",
        (None, None) => UNCATEGORIZED,
    }
}

fn file_uri(path: &Path) -> String {
    std::path::absolute(path)
        .ok()
        .and_then(|absolute| Url::from_file_path(absolute).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| format!("file://{}", path.display()))
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }

    let kept = value.chars().take(width.saturating_sub(1)).collect::<String>();
    format!("{kept}…")
}
