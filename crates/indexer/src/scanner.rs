use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Files larger than this are treated as generated artifacts and skipped.
pub const MAX_FILE_SIZE: u64 = 1_048_576;

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "mjs", "cjs", "go", "java", "kt", "c", "h", "cpp",
    "hpp", "cc", "cs", "rb", "php", "swift", "scala", "sh", "sql", "proto", "md", "toml", "yaml",
    "yml", "json",
];

/// Whether this path carries a recognized source-content extension.
#[must_use]
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// Enumerates indexable files under a project root.
///
/// Honors `.gitignore` and hidden-file conventions via the `ignore` walker
/// and filters to recognized source extensions under the size cap.
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Candidate files in deterministic (sorted) order.
    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .build()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|path| is_source_file(path))
            .filter(|path| {
                std::fs::metadata(path).is_ok_and(|meta| meta.len() <= MAX_FILE_SIZE)
            })
            .collect();
        files.sort();
        files
    }
}
