use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds the Rust sources of a project.
///
/// Scanning starts at the project's `src` directory when there is one, so that
/// module paths line up with `crate::...`. The `target` directory and hidden
/// directories are skipped. Files come back sorted by path, which keeps the
/// generated document stable between runs.
///
/// # Example
///
/// ```no_run
/// use endpoint_openapi_parser::scanner::SourceScanner;
/// use std::path::PathBuf;
///
/// let scanner = SourceScanner::for_project(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!(
///     "Found {} Rust files under {}",
///     result.rust_files.len(),
///     scanner.source_root().display()
/// );
/// ```
pub struct SourceScanner {
    source_root: PathBuf,
}

/// Result of a scan.
pub struct ScanResult {
    /// Paths of all discovered `.rs` files, sorted
    pub rust_files: Vec<PathBuf>,
    /// Entries that could not be read
    pub warnings: Vec<String>,
}

impl SourceScanner {
    /// Scans `source_root` as the directory holding `lib.rs`/`main.rs`.
    pub fn new(source_root: PathBuf) -> Self {
        Self { source_root }
    }

    /// Scans `project/src` if it exists, otherwise the project directory itself.
    pub fn for_project(project: PathBuf) -> Self {
        let src = project.join("src");
        if src.is_dir() {
            Self::new(src)
        } else {
            Self::new(project)
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Collects all `.rs` files below the source root.
    ///
    /// # Errors
    ///
    /// Returns an error if the source root is not a readable directory.
    pub fn scan(&self) -> Result<ScanResult> {
        let metadata = std::fs::metadata(&self.source_root)
            .with_context(|| format!("Cannot access source root {}", self.source_root.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("Source root is not a directory: {}", self.source_root.display());
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.source_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.source_root {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        debug!("Found {} Rust files under {}", rust_files.len(), self.source_root.display());
        Ok(ScanResult { rust_files, warnings })
    }
}
