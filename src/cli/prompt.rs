use crate::db::CategoryRow;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::io::IsTerminal;
use std::path::Path;

const NO_CATEGORY: &str = "(no category)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDetails {
    pub name: String,
    pub category: Option<String>,
    pub keywords: String,
}

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Fills upload fields the user did not pass on the command line. Without a
/// terminal (or with `--yes`) the defaults are taken as-is.
pub fn upload_details(
    source: &Path,
    name: Option<String>,
    category: Option<String>,
    keywords: Option<String>,
    categories: &[CategoryRow],
    ask: bool,
) -> Result<UploadDetails> {
    let default_name = default_name_for(source);

    if !ask {
        return Ok(UploadDetails {
            name: name.unwrap_or(default_name),
            category,
            keywords: keywords.unwrap_or_default(),
        });
    }

    let theme = ColorfulTheme::default();

    let name = match name {
        Some(value) => value,
        None => Input::with_theme(&theme)
            .with_prompt("Document name")
            .default(default_name)
            .validate_with(|input: &String| -> std::result::Result<(), &str> {
                if input.trim().is_empty() {
                    Err("Document name is required")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .context("Failed to read document name")?,
    };

    let category = match category {
        Some(value) => Some(value),
        None => {
            let items = std::iter::once(NO_CATEGORY)
                .chain(categories.iter().map(|category| category.name.as_str()))
                .collect::<Vec<_>>();

            let selected = Select::with_theme(&theme)
                .with_prompt("Category")
                .default(0)
                .items(&items)
                .interact()
                .context("Failed to select category")?;

            selected
                .checked_sub(1)
                .and_then(|index| categories.get(index))
                .map(|category| category.name.clone())
        }
    };

    let keywords = match keywords {
        Some(value) => value,
        None => Input::with_theme(&theme)
            .with_prompt("Keywords")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read keywords")?,
    };

    Ok(UploadDetails {
        name,
        category,
        keywords,
    })
}

pub fn confirm_category_delete(name: &str, referencing_documents: usize) -> Result<bool> {
    let prompt = if referencing_documents == 0 {
        format!("Delete category '{name}'?")
    } else {
        format!(
            "Delete category '{name}'? {referencing_documents} document(s) will keep a reference to it"
        )
    };

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read delete confirmation")
}

fn default_name_for(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
