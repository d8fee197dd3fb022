//! Source/target directory fixtures

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory holding a populated source and an empty target
pub struct SyncPair {
    root: TempDir,
}

impl SyncPair {
    /// Create a pair whose source contains a small project tree
    pub fn new() -> Result<Self> {
        let root = TempDir::new()?;
        let pair = Self { root };

        pair.write("README.md", "# demo\n")?;
        pair.write("src/main.rs", "fn main() {}\n")?;
        pair.write("src/lib/util.rs", "pub fn helper() {}\n")?;
        pair.write(".git/HEAD", "ref: refs/heads/main\n")?;
        fs::create_dir_all(pair.target())?;

        Ok(pair)
    }

    /// Scratch root, used as the working directory for commands
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn source(&self) -> PathBuf {
        self.root.path().join("source")
    }

    pub fn target(&self) -> PathBuf {
        self.root.path().join("target")
    }

    /// Write a file under the source tree
    pub fn write(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.source().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Read a file from the target tree
    pub fn read_target(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.target().join(rel)).ok()
    }
}
