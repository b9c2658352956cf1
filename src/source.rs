use crate::error::{Error, Result};
use crate::model::ROOT_PACKAGE;
use log::{debug, warn};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Parses Rust source files into syntax trees tagged with their module path.
///
/// # Example
///
/// ```no_run
/// use endpoint_openapi_parser::source::SourceParser;
/// use std::path::Path;
///
/// let parsed = SourceParser::parse_file(Path::new("src/api/users.rs"), Path::new("src")).unwrap();
/// assert_eq!(parsed.module_path, "crate::api::users");
/// ```
pub struct SourceParser;

/// A successfully parsed Rust file.
#[derive(Debug)]
pub struct SourceFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Module the file defines, e.g. `crate::api::users`
    pub module_path: String,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl SourceParser {
    /// Parses a single Rust source file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the Rust source file to parse
    /// * `source_root` - Directory holding `lib.rs`/`main.rs`, used to derive the module path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid Rust syntax.
    pub fn parse_file(path: &Path, source_root: &Path) -> Result<SourceFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)?;
        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::Parse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(SourceFile {
            path: path.to_path_buf(),
            module_path: module_path_for(source_root, path),
            syntax_tree,
        })
    }

    /// Parses in-memory source as the module `module_path`.
    pub fn parse_str(module_path: &str, content: &str) -> Result<SourceFile> {
        let syntax_tree = syn::parse_file(content).map_err(|e| Error::Parse {
            file: PathBuf::from(module_path),
            message: e.to_string(),
        })?;
        Ok(SourceFile {
            path: PathBuf::from(module_path),
            module_path: module_path.to_string(),
            syntax_tree,
        })
    }

    /// Parses multiple files, continuing past failures.
    ///
    /// Files that fail to parse are logged as warnings; the caller decides
    /// whether a partial set of files is acceptable.
    pub fn parse_files(paths: &[PathBuf], source_root: &Path) -> Vec<Result<SourceFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<SourceFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path, source_root).map_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    e
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// Derives the module path of a file from its location under the source root.
///
/// `lib.rs` and `main.rs` at the root are the crate itself, `mod.rs` names its
/// directory. Files outside the root are treated as top-level modules.
pub fn module_path_for(source_root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(source_root).unwrap_or(file);
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
        let is_crate_root = segments.is_empty() && (stem == "lib" || stem == "main");
        if stem != "mod" && !is_crate_root {
            segments.push(stem);
        }
    }

    let mut path = vec![ROOT_PACKAGE.to_string()];
    path.extend(segments);
    path.join("::")
}
