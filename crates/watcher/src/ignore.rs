//! Ignore rules for events and snapshots
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (VCS metadata, editor temp files - always active)
//! 2. .gitignore patterns (optional, enabled by default)
//! 3. .msyncignore patterns (optional, enabled by default)
//! 4. Config-based patterns (gitignore syntax)

use anyhow::{Context, Result};
use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory names that are never replicated
const BUILTIN_DIRS: &[&str] = &[".git", ".jj", ".hg", ".svn", ".msync"];

/// Ignore rule set for one source root
///
/// Paths are matched relative to the root.
pub struct IgnoreRules {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    msyncignore: Option<Gitignore>,
    additional: Option<Gitignore>,
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for `root`
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            msyncignore: None,
            additional: None,
            config,
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Rules that only apply the built-in patterns
    pub fn builtin_only(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            gitignore: None,
            msyncignore: None,
            additional: None,
            config: IgnoreConfig {
                use_gitignore: false,
                use_msyncignore: false,
                additional_patterns: Vec::new(),
            },
        }
    }

    /// Re-read ignore files from disk
    pub fn reload(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            self.load_file(".gitignore")?
        } else {
            None
        };

        self.msyncignore = if self.config.use_msyncignore {
            self.load_file(".msyncignore")?
        } else {
            None
        };

        self.additional = if self.config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.additional_patterns {
                builder
                    .add_line(None, pattern)
                    .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
            }
            Some(builder.build()?)
        };

        Ok(())
    }

    fn load_file(&self, name: &str) -> Result<Option<Gitignore>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(&path) {
            return Err(err).with_context(|| format!("Failed to parse {}", path.display()));
        }
        Ok(Some(builder.build()?))
    }

    /// Check if a root-relative path should be ignored
    ///
    /// `is_dir` is passed in because deleted paths can no longer be stat'ed.
    pub fn should_ignore(&self, rel_path: &Path, is_dir: bool) -> bool {
        if is_builtin_ignored(rel_path) {
            return true;
        }

        // .msyncignore can whitelist what .gitignore excludes
        if let Some(ref msyncignore) = self.msyncignore {
            let m = msyncignore.matched_path_or_any_parents(rel_path, is_dir);
            if m.is_ignore() {
                return true;
            }
            if m.is_whitelist() {
                return false;
            }
        }

        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched_path_or_any_parents(rel_path, is_dir).is_ignore() {
                return true;
            }
        }

        if let Some(ref additional) = self.additional {
            if additional.matched_path_or_any_parents(rel_path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        1 + usize::from(self.gitignore.is_some())
            + usize::from(self.msyncignore.is_some())
            + usize::from(self.additional.is_some())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Built-in patterns, enforced regardless of configuration
fn is_builtin_ignored(rel_path: &Path) -> bool {
    let in_builtin_dir = rel_path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|name| BUILTIN_DIRS.contains(&name))
            .unwrap_or(false)
    });
    if in_builtin_dir {
        return true;
    }

    let filename = rel_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    is_temp_file(filename)
}

/// Editor swap/backup files, OS metadata and our own in-flight temp files
fn is_temp_file(filename: &str) -> bool {
    // Vim swap files
    if filename.ends_with(".swp") || filename.ends_with(".swo") || filename.ends_with(".swx") {
        return true;
    }

    // Backup files (~) and Emacs lock/auto-save files
    if filename.ends_with('~')
        || filename.starts_with(".#")
        || (filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#'))
    {
        return true;
    }

    // MacOS / Windows system files
    if filename == ".DS_Store" || filename.starts_with("._") || filename == "Thumbs.db" {
        return true;
    }

    // Atomic-write temp files from the applier
    filename.starts_with(".msync-") && filename.ends_with(".tmp")
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .msyncignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_msyncignore: bool,

    /// Additional patterns in gitignore syntax
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_msyncignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
