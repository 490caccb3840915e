//! Resource task layer
//!
//! A resource task holds either the desired shape of one cloud resource
//! (from configuration) or its actual shape (read back from the backend).
//! The reconciliation driver pairs the two by identity, diffs them, and
//! hands the diff to a render target.
//!
//! # Module Structure
//!
//! - [`registry`] - Name-keyed registry of sibling resource references
//! - [`instance`] - The compute-instance task: find, diff, and mapping
//!
//! Cross-resource references are deliberately weak: a task stores only the
//! sibling's name and resolves it through the registry at mapping time, so
//! the dependency graph may contain cycles without ownership ambiguity.

pub mod instance;
pub mod registry;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Identity contract used to pair a desired task with its actual
/// counterpart across collections.
pub trait CompareWithId {
    fn compare_with_id(&self) -> Option<&str>;
}

/// A lazily-rendered content source for metadata values.
///
/// Desired state may point at a file on disk; rendering is deferred until
/// the task is mapped into a backend payload, and can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Literal(String),
    File(PathBuf),
}

impl ContentSource {
    pub fn literal(value: &str) -> Self {
        ContentSource::Literal(value.to_string())
    }

    /// Render the content to a string.
    pub fn render(&self) -> Result<String> {
        match self {
            ContentSource::Literal(value) => Ok(value.clone()),
            ContentSource::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read content from {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_renders_verbatim() {
        let source = ContentSource::literal("#!/bin/sh\necho hi");
        assert_eq!(source.render().unwrap(), "#!/bin/sh\necho hi");
    }

    #[test]
    fn test_missing_file_fails_to_render() {
        let source = ContentSource::File(PathBuf::from("/nonexistent/startup.sh"));
        assert!(source.render().is_err());
    }
}
