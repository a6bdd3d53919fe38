use crate::splice::OffsetEncoding;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Workspace root results are resolved against
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub offset_encoding: OffsetEncoding,
    /// Refuse to overwrite a file whose content no longer matches its snapshot
    #[serde(default = "default_true")]
    pub verify_source: bool,
    /// Refuse file effects outside `root` or inside `forbidden`
    #[serde(default = "default_true")]
    pub guard_workspace: bool,
    /// Root-relative directories no action may touch
    #[serde(default = "default_forbidden")]
    pub forbidden: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_forbidden() -> Vec<PathBuf> {
    vec![PathBuf::from(".git")]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: None,
            offset_encoding: OffsetEncoding::default(),
            verify_source: true,
            guard_workspace: true,
            forbidden: default_forbidden(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(root) = &self.root {
            if root.as_os_str().is_empty() {
                issues.push(ValidationIssue::EmptyField { field: "root" });
            }
        }

        for dir in &self.forbidden {
            if dir.as_os_str().is_empty() {
                issues.push(ValidationIssue::EmptyField { field: "forbidden" });
            } else if dir.is_absolute() {
                issues.push(ValidationIssue::AbsoluteForbidden { path: dir.clone() });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyField { field: &'static str },
    AbsoluteForbidden { path: PathBuf },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyField { field } => {
                write!(f, "setting '{field}' must not be empty")
            }
            ValidationIssue::AbsoluteForbidden { path } => write!(
                f,
                "forbidden directory '{}' must be relative to the workspace root",
                path.display()
            ),
        }
    }
}
