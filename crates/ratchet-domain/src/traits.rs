//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the assurance core and the
//! systems it does not own: project accounts and blob storage.

use crate::ProjectRef;
use std::collections::HashSet;

/// Answers whether a project exists
///
/// Implemented by the account layer.
pub trait ProjectDirectory: Send + Sync {
    /// Whether `project` refers to an existing project
    fn project_exists(&self, project: &ProjectRef) -> bool;
}

/// Directory that treats every project reference as valid
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDirectory;

impl ProjectDirectory for OpenDirectory {
    fn project_exists(&self, _project: &ProjectRef) -> bool {
        true
    }
}

/// Directory backed by a fixed set of project references
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    projects: HashSet<String>,
}

impl StaticDirectory {
    /// Create a directory from project references
    pub fn new<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            projects: projects.into_iter().map(Into::into).collect(),
        }
    }
}

impl ProjectDirectory for StaticDirectory {
    fn project_exists(&self, project: &ProjectRef) -> bool {
        self.projects.contains(project.as_str())
    }
}

/// Fetches evidence content from blob storage
///
/// Implemented by the storage layer; the core only owns digests.
pub trait ContentSource {
    /// Error type for fetch operations
    type Error: std::fmt::Display;

    /// Fetch the bytes stored under `source`
    fn fetch(&self, source: &str) -> Result<Vec<u8>, Self::Error>;
}
