use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static UNSAFE_FILE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*&^%!()\x00-\x1F]"#).expect("file name pattern is valid")
});

/// File-system safe stem for a catalogued name. The name itself is kept
/// verbatim in the database; only the on-disk copy uses this form.
pub fn file_stem_for(name: &str) -> String {
    let replaced = UNSAFE_FILE_CHARS.replace_all(name.trim(), "_");

    if replaced.chars().all(|ch| ch == '.') {
        return "_".repeat(replaced.len().max(1));
    }

    replaced.into_owned()
}

/// Extension of the source including the leading dot, or empty.
pub fn dotted_extension(source: &Path) -> String {
    source
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default()
}

/// `stem.ext` for the first attempt, then `stem_1.ext`, `stem_2.ext`, ...
pub fn candidate_file_name(stem: &str, extension: &str, attempt: usize) -> String {
    if attempt == 0 {
        format!("{stem}{extension}")
    } else {
        format!("{stem}_{attempt}{extension}")
    }
}
