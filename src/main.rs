mod cli;
mod config;
mod db;
mod error;
mod intake;
mod launcher;

use crate::cli::output::{self, DocumentDetail};
use crate::cli::{CategoryCommands, Cli, Commands, ConfigCommands, prompt};
use crate::config::Config;
use crate::db::{Database, DocumentRow, SearchFilter};
use crate::error::{UserError, find_user_error};
use crate::intake::IntakeRequest;
use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONVERSION_GUIDE: &str = "To convert between PDF and Word we recommend:

  - LibreOffice (free)
  - Microsoft Word
  - Online tools such as SmallPDF

LexArchive does not convert files itself.";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match find_user_error(&error) {
                Some(user_error) => eprintln!("Error: {user_error}"),
                None => eprintln!("Error: {error:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

struct Session {
    data_dir: PathBuf,
    config: Config,
    json: bool,
}

impl Session {
    fn open_database(&self) -> Result<Database> {
        Database::open(&self.config.db_path)
    }
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = Config::resolve_data_dir(cli.data_dir.as_deref());
    let config = Config::load_or_create(&data_dir)?;
    config.ensure_directories()?;

    let session = Session {
        data_dir,
        config,
        json: cli.json,
    };

    match cli.command {
        Commands::Init => handle_init(&session),
        Commands::Upload {
            sources,
            name,
            category,
            keywords,
            yes,
        } => handle_upload(&session, &sources, name, category, keywords, yes),
        Commands::Search {
            query,
            category,
            limit,
            offset,
        } => handle_search(&session, &query.join(" "), category.as_deref(), limit, offset),
        Commands::Recent { limit } => handle_recent(&session, limit),
        Commands::Show { id } => handle_show(&session, id),
        Commands::Open { id, no_launch } => handle_open(&session, id, no_launch),
        Commands::Category { command } => handle_category_command(&session, command),
        Commands::Config { command } => handle_config_command(session, command),
        Commands::Status => handle_status(&session),
        Commands::Doctor => handle_doctor(&session),
        Commands::Convert => {
            println!("{CONVERSION_GUIDE}");
            Ok(())
        }
    }
}

fn handle_init(session: &Session) -> Result<()> {
    let database = session.open_database()?;
    let stats = database.stats()?;

    info!(data_dir = %session.data_dir.display(), "catalog initialized");

    if session.json {
        return output::print_json(&json!({
            "data_dir": session.data_dir.display().to_string(),
            "db_path": session.config.db_path.display().to_string(),
            "files_dir": session.config.files_dir.display().to_string(),
            "stats": stats,
        }));
    }

    println!("LexArchive catalog ready");
    println!("- data_dir: {}", session.data_dir.display());
    println!("- database: {}", session.config.db_path.display());
    println!("- files_dir: {}", session.config.files_dir.display());
    println!("- categories: {}", stats.categories);
    println!("- documents: {}", stats.documents);

    Ok(())
}

fn handle_upload(
    session: &Session,
    sources: &[PathBuf],
    name: Option<String>,
    category: Option<String>,
    keywords: Option<String>,
    yes: bool,
) -> Result<()> {
    let database = session.open_database()?;
    let ask = !yes && prompt::is_interactive();
    let fields = UploadFields {
        name,
        category,
        keywords,
    };

    let documents = import_sources(&database, &session.config.files_dir, sources, &fields, ask)?;

    if session.json {
        return output::print_json(&documents);
    }

    for document in &documents {
        println!(
            "Saved document #{}: {} -> {}",
            document.id,
            document.name,
            document.stored_path.display()
        );
    }

    Ok(())
}

/// Values given on the command line; each file prompts for whatever is missing.
struct UploadFields {
    name: Option<String>,
    category: Option<String>,
    keywords: Option<String>,
}

/// Imports each source in order and stops at the first failure. Files
/// imported before the failure stay catalogued.
fn import_sources(
    database: &Database,
    files_dir: &Path,
    sources: &[PathBuf],
    fields: &UploadFields,
    ask: bool,
) -> Result<Vec<DocumentRow>> {
    let categories = database.list_categories()?;
    let mut documents = Vec::with_capacity(sources.len());

    for source in sources {
        let details = prompt::upload_details(
            source,
            fields.name.clone(),
            fields.category.clone(),
            fields.keywords.clone(),
            &categories,
            ask,
        )?;

        let document = intake::import_document(
            database,
            files_dir,
            &IntakeRequest {
                source,
                name: &details.name,
                category: details.category.as_deref(),
                keywords: &details.keywords,
            },
        )?;
        documents.push(document);
    }

    info!(count = documents.len(), "upload finished");
    Ok(documents)
}

fn handle_search(
    session: &Session,
    query: &str,
    category: Option<&str>,
    limit: Option<usize>,
    offset: usize,
) -> Result<()> {
    let database = session.open_database()?;
    let documents = database.search_documents(
        query,
        &SearchFilter {
            category,
            limit: Some(limit.unwrap_or(session.config.search_limit)),
            offset,
        },
    )?;

    if session.json {
        return output::print_json(&documents);
    }

    output::print_documents(&documents, "No documents found");
    Ok(())
}

fn handle_recent(session: &Session, limit: Option<usize>) -> Result<()> {
    let database = session.open_database()?;
    let documents = database.recent_documents(limit.unwrap_or(session.config.recent_limit))?;

    if session.json {
        return output::print_json(&documents);
    }

    output::print_documents(&documents, "No documents yet");
    Ok(())
}

fn handle_show(session: &Session, id: i64) -> Result<()> {
    let database = session.open_database()?;
    let document = database
        .document(id)?
        .ok_or(UserError::DocumentNotFound(id))?;
    let detail = DocumentDetail::new(&document);

    if session.json {
        return output::print_json(&detail);
    }

    output::print_document_detail(&detail);
    Ok(())
}

fn handle_open(session: &Session, id: i64, no_launch: bool) -> Result<()> {
    let database = session.open_database()?;
    let document = database.touch_document(id)?;

    if !document.stored_path.exists() {
        return Err(UserError::MissingFile(document.stored_path).into());
    }

    let launch = session.config.launch_on_open && !no_launch;
    if launch {
        launcher::open_with_default_app(&document.stored_path)?;
    }

    info!(id, launched = launch, "document opened");

    if session.json {
        return output::print_json(&document);
    }

    println!("{}", document.stored_path.display());
    Ok(())
}

fn handle_category_command(session: &Session, command: CategoryCommands) -> Result<()> {
    let database = session.open_database()?;

    match command {
        CategoryCommands::List => {
            let categories = database.list_categories()?;
            if session.json {
                return output::print_json(&categories);
            }
            output::print_categories(&categories);
        }
        CategoryCommands::Add { name } => {
            let category = database.add_category(&name)?;
            if session.json {
                return output::print_json(&category);
            }
            println!("Category added: {}", category.name);
        }
        CategoryCommands::Delete { name, yes } => {
            let referencing = database.documents_in_category(&name)?.len();

            if !yes {
                if !prompt::is_interactive() {
                    bail!("Refusing to delete category '{name}' without --yes");
                }
                if !prompt::confirm_category_delete(&name, referencing)? {
                    println!("Kept category: {name}");
                    return Ok(());
                }
            }

            let deleted = database.delete_category(&name)?;
            if session.json {
                return output::print_json(&json!({ "name": name, "deleted": deleted }));
            }

            if deleted == 0 {
                println!("No category named: {name}");
            } else if referencing > 0 {
                println!(
                    "Category deleted: {name} ({referencing} document(s) still reference it)"
                );
            } else {
                println!("Category deleted: {name}");
            }
        }
        CategoryCommands::Files { name } => {
            let documents = database.documents_in_category(&name)?;
            if session.json {
                return output::print_json(&documents);
            }
            output::print_documents(&documents, "No documents in this category");
        }
    }

    Ok(())
}

fn handle_config_command(session: Session, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = session.config;
            config.set_value(&key, &value)?;
            config.ensure_directories()?;
            config.save(&session.data_dir)?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let value = session
                .config
                .get_value(&key)
                .ok_or(UserError::UnknownConfigKey(key))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status(session: &Session) -> Result<()> {
    let database = session.open_database()?;
    let stats = database.stats()?;

    if session.json {
        return output::print_json(&stats);
    }

    println!("LexArchive status");
    println!("- data_dir: {}", session.data_dir.display());
    println!("- database: {}", session.config.db_path.display());
    println!("- files_dir: {}", session.config.files_dir.display());
    println!("- documents: {}", stats.documents);
    println!("- categories: {}", stats.categories);
    println!("- orphaned_documents: {}", stats.orphaned_documents);
    println!(
        "- last_accessed_at: {}",
        stats
            .last_accessed_at
            .map(output::format_timestamp)
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_doctor(session: &Session) -> Result<()> {
    let config_path = Config::config_path(&session.data_dir);
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    let database = match session.open_database() {
        Ok(database) => {
            println!("[OK] SQLite reachable: {}", session.config.db_path.display());
            Some(database)
        }
        Err(error) => {
            println!("[WARN] SQLite check failed: {error:#}");
            issues.push("db unreachable");
            None
        }
    };

    if session.config.files_dir.is_dir() {
        println!("[OK] files dir exists: {}", session.config.files_dir.display());
    } else {
        println!(
            "[WARN] files dir missing: {}",
            session.config.files_dir.display()
        );
        issues.push("files dir missing");
    }

    if let Some(database) = database {
        let stats = database.stats()?;
        if stats.orphaned_documents == 0 {
            println!("[OK] every document points at an existing category or none");
        } else {
            println!(
                "[WARN] {} document(s) reference a deleted category",
                stats.orphaned_documents
            );
            issues.push("dangling category references");
        }

        let stored = database.stored_paths()?;
        let missing = stored
            .iter()
            .filter(|(_, path)| !path.exists())
            .map(|(id, _)| id.to_string())
            .collect::<Vec<_>>();

        if missing.is_empty() {
            println!("[OK] all {} stored file(s) present", stored.len());
        } else {
            println!(
                "[WARN] stored files missing for document id(s): {}",
                missing.join(", ")
            );
            issues.push("stored files missing");
        }

        let untracked = untracked_files(&session.config.files_dir, &stored)?;
        if untracked.is_empty() {
            println!("[OK] no untracked files in files dir");
        } else {
            println!(
                "[WARN] files not in the catalog: {}",
                untracked.join(", ")
            );
            issues.push("untracked files");
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        warn!(count = issues.len(), "doctor found issues");
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn untracked_files(files_dir: &Path, stored: &[(i64, PathBuf)]) -> Result<Vec<String>> {
    if !files_dir.is_dir() {
        return Ok(Vec::new());
    }

    let known = stored
        .iter()
        .filter_map(|(_, path)| path.file_name().map(ToOwned::to_owned))
        .collect::<HashSet<_>>();

    let entries = fs::read_dir(files_dir)
        .with_context(|| format!("Failed to read files directory: {}", files_dir.display()))?;

    let mut untracked = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name())
        .filter(|name| !known.contains(name))
        .map(|name| name.to_string_lossy().to_string())
        .collect::<Vec<_>>();
    untracked.sort();

    Ok(untracked)
}

#[cfg(test)]
mod tests {
    use super::{Session, UploadFields, handle_open, import_sources, untracked_files};
    use crate::config::Config;
    use crate::db::Database;
    use crate::error::{UserError, find_user_error};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn session_in(data_dir: &Path) -> Session {
        let config = Config::for_data_dir(data_dir);
        config.ensure_directories().expect("directories");
        Session {
            data_dir: data_dir.to_path_buf(),
            config,
            json: false,
        }
    }

    fn no_fields() -> UploadFields {
        UploadFields {
            name: None,
            category: None,
            keywords: None,
        }
    }

    #[test]
    fn upload_of_several_sources_catalogues_each_file() {
        let dir = tempdir().expect("tempdir");
        let session = session_in(&dir.path().join("data"));
        let first = dir.path().join("Contrato.pdf");
        let second = dir.path().join("Procuração.docx");
        fs::write(&first, b"contrato").expect("write first");
        fs::write(&second, b"procuracao").expect("write second");

        let database = session.open_database().expect("database");
        let documents = import_sources(
            &database,
            &session.config.files_dir,
            &[first, second],
            &no_fields(),
            false,
        )
        .expect("upload");

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].name, "Contrato");
        assert_eq!(documents[1].name, "Procuração");
        assert!(session.config.files_dir.join("Contrato.pdf").exists());
        assert!(session.config.files_dir.join("Procuração.docx").exists());
        assert_eq!(database.stats().expect("stats").documents, 2);
    }

    #[test]
    fn shared_name_gets_numbered_copies() {
        let dir = tempdir().expect("tempdir");
        let session = session_in(&dir.path().join("data"));
        let first = dir.path().join("a.pdf");
        let second = dir.path().join("b.pdf");
        fs::write(&first, b"a").expect("write first");
        fs::write(&second, b"b").expect("write second");

        let database = session.open_database().expect("database");
        let fields = UploadFields {
            name: Some("Sentença".to_string()),
            ..no_fields()
        };
        let documents = import_sources(
            &database,
            &session.config.files_dir,
            &[first, second],
            &fields,
            false,
        )
        .expect("upload");

        assert_eq!(
            documents[0].stored_path,
            session.config.files_dir.join("Sentença.pdf")
        );
        assert_eq!(
            documents[1].stored_path,
            session.config.files_dir.join("Sentença_1.pdf")
        );
    }

    #[test]
    fn open_of_missing_copy_still_moves_it_to_the_front() {
        let dir = tempdir().expect("tempdir");
        let session = session_in(&dir.path().join("data"));
        let first = dir.path().join("Contrato.pdf");
        let second = dir.path().join("Parecer.pdf");
        fs::write(&first, b"a").expect("write first");
        fs::write(&second, b"b").expect("write second");

        let database = Database::open(&session.config.db_path).expect("database");
        let documents = import_sources(
            &database,
            &session.config.files_dir,
            &[first, second],
            &no_fields(),
            false,
        )
        .expect("upload");
        let missing = &documents[0];
        assert_eq!(
            database.recent_documents(20).expect("recent")[0].id,
            documents[1].id
        );

        fs::remove_file(&missing.stored_path).expect("remove copy");

        let error = handle_open(&session, missing.id, true).expect_err("missing file");
        assert!(matches!(
            find_user_error(&error),
            Some(UserError::MissingFile(path)) if path == &missing.stored_path
        ));
        assert_eq!(
            database.recent_documents(20).expect("recent")[0].id,
            missing.id
        );
    }

    #[test]
    fn open_without_launch_touches_existing_copy() {
        let dir = tempdir().expect("tempdir");
        let session = session_in(&dir.path().join("data"));
        let first = dir.path().join("Contrato.pdf");
        let second = dir.path().join("Parecer.pdf");
        fs::write(&first, b"a").expect("write first");
        fs::write(&second, b"b").expect("write second");

        let database = session.open_database().expect("database");
        let documents = import_sources(
            &database,
            &session.config.files_dir,
            &[first, second],
            &no_fields(),
            false,
        )
        .expect("upload");

        handle_open(&session, documents[0].id, true).expect("open");

        assert_eq!(
            database.recent_documents(20).expect("recent")[0].id,
            documents[0].id
        );
    }

    #[test]
    fn untracked_files_skips_catalogued_copies() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("Contrato.pdf"), b"a").expect("write tracked");
        fs::write(dir.path().join("Sobra.pdf"), b"b").expect("write untracked");

        let stored = vec![(1, dir.path().join("Contrato.pdf"))];
        let untracked = untracked_files(dir.path(), &stored).expect("scan");

        assert_eq!(untracked, vec!["Sobra.pdf".to_string()]);
    }

    #[test]
    fn untracked_files_tolerates_missing_dir() {
        let dir = tempdir().expect("tempdir");
        let untracked = untracked_files(&dir.path().join("absent"), &[]).expect("scan");
        assert!(untracked.is_empty());
    }
}
