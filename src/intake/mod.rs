pub mod naming;

use crate::db::{Database, DocumentRow, NewDocument};
use crate::error::UserError;
use anyhow::{Context, Result};
use std::fs::{self, File, FileTimes, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct IntakeRequest<'a> {
    pub source: &'a Path,
    pub name: &'a str,
    pub category: Option<&'a str>,
    pub keywords: &'a str,
}

/// Copies `request.source` into `files_dir` under a name derived from
/// `request.name` and records the copy in the catalog.
pub fn import_document(
    database: &Database,
    files_dir: &Path,
    request: &IntakeRequest<'_>,
) -> Result<DocumentRow> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(UserError::EmptyField("name").into());
    }

    let source_metadata = fs::metadata(request.source)
        .ok()
        .filter(|metadata| metadata.is_file())
        .ok_or_else(|| UserError::SourceNotFound(request.source.to_path_buf()))?;

    fs::create_dir_all(files_dir).with_context(|| {
        format!("Failed to create files directory: {}", files_dir.display())
    })?;

    let stem = naming::file_stem_for(name);
    let extension = naming::dotted_extension(request.source);
    let (destination, file) = reserve_destination(files_dir, &stem, &extension)?;

    if let Err(error) = copy_contents(request.source, &source_metadata, file, &destination) {
        discard_copy(&destination);
        return Err(error);
    }

    let inserted = database.insert_document(&NewDocument {
        name,
        stored_path: &destination,
        category: request.category,
        keywords: request.keywords.trim(),
    });

    match inserted {
        Ok(document) => {
            info!(
                id = document.id,
                path = %destination.display(),
                category = document.category.as_deref().unwrap_or("-"),
                "document imported"
            );
            Ok(document)
        }
        Err(error) => {
            discard_copy(&destination);
            Err(error)
        }
    }
}

/// Claims the first free candidate name with a create-new open so that no
/// existing file is ever overwritten.
fn reserve_destination(files_dir: &Path, stem: &str, extension: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0;

    loop {
        let candidate = files_dir.join(naming::candidate_file_name(stem, extension, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(error) => {
                return Err(error).with_context(|| {
                    format!("Failed to create stored file: {}", candidate.display())
                });
            }
        }
    }
}

fn copy_contents(
    source: &Path,
    source_metadata: &fs::Metadata,
    mut destination_file: File,
    destination: &Path,
) -> Result<()> {
    let mut reader = File::open(source)
        .with_context(|| format!("Failed to open source file: {}", source.display()))?;

    io::copy(&mut reader, &mut destination_file).with_context(|| {
        format!(
            "Failed to copy file: {} -> {}",
            source.display(),
            destination.display()
        )
    })?;

    let mut times = FileTimes::new();
    if let Ok(modified) = source_metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = source_metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    destination_file.set_times(times).with_context(|| {
        format!("Failed to copy file times to: {}", destination.display())
    })?;
    drop(destination_file);

    fs::set_permissions(destination, source_metadata.permissions()).with_context(|| {
        format!("Failed to copy permissions to: {}", destination.display())
    })?;

    Ok(())
}

fn discard_copy(destination: &Path) {
    if let Err(error) = fs::remove_file(destination) {
        warn!(
            error = %error,
            path = %destination.display(),
            "failed to remove copied file after intake error"
        );
    }
}
