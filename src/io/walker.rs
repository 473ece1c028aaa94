use crate::config::ScanConfig;
use crate::core::{Error, Result};
use crate::utils::relative_key;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct FileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    ignore_patterns: Vec<glob::Pattern>,
    follow_links: bool,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            extensions: ScanConfig::default().extensions,
            ignore_patterns: vec![],
            follow_links: false,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Patterns are matched against root-relative, `/`-separated paths.
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore_patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Matching files in path order. Unreadable entries below the root are
    /// logged and skipped.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| Error::io_at(e, &self.root))?;
        if !metadata.is_dir() {
            return Err(Error::file_system("not a directory", &self.root));
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .follow_links(self.follow_links)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            let path = entry.path();

            if entry.file_type().is_some_and(|t| t.is_file()) && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        debug!(root = %self.root.display(), files = files.len(), "walked source tree");
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = ext.to_string_lossy().to_ascii_lowercase();
        if !self.extensions.contains(&ext) {
            return false;
        }

        let key = relative_key(path, &self.root);
        !self.ignore_patterns.iter().any(|p| p.matches(&key))
    }
}

/// Source files under `root`. Fails when the root cannot be read or nothing
/// matches.
pub fn find_source_files(root: &Path, scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    let files = FileWalker::new(root.to_path_buf())
        .with_extensions(scan.extensions.clone())
        .with_ignore_patterns(&scan.ignore)?
        .follow_links(scan.follow_links)
        .walk()?;

    if files.is_empty() {
        return Err(Error::NoFilesMatched {
            root: root.to_path_buf(),
        });
    }
    Ok(files)
}
