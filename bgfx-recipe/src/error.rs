//! Error handling for recipe operations

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for recipe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when fewer library artifacts are found than a recipe expects.
pub const MISSING_LIBS_MESSAGE: &str = "Less lib files found for copy than expected. Aborting.";

/// Pipeline phase, used to tell the user which step of a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Settings and option validation
    Validate,
    /// Version resolution from repository history
    Version,
    /// Cloning and checking out sources
    Fetch,
    /// Settings to build plan mapping
    Map,
    /// Project generator run
    Generate,
    /// Native build tool run
    Build,
    /// Artifact collection into the package layout
    Package,
    /// Package compression
    Archive,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::Version => "version",
            Phase::Fetch => "fetch",
            Phase::Map => "map",
            Phase::Generate => "generate",
            Phase::Build => "build",
            Phase::Package => "package",
            Phase::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while resolving, building or packaging a library
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid settings or options
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// A settings combination that has no entry in a mapping table
    #[error("Unsupported variant: no {table} entry for {key}")]
    Unsupported { table: &'static str, key: String },

    /// Clone, checkout or history query failed
    #[error("Source control error: {message}")]
    SourceControl { message: String },

    /// An external tool exited unsuccessfully
    #[error("`{command}` failed with {}", exit_description(.code))]
    ToolFailed { command: String, code: Option<i32> },

    /// Fewer library artifacts than the recipe expects
    #[error(
        "Less lib files found for copy than expected. Aborting. (expected {expected}, found {found} in {})",
        .dir.display()
    )]
    MissingLibraries {
        expected: usize,
        found: usize,
        dir: PathBuf,
    },

    /// Any other packaging invariant violation
    #[error("Packaging error: {message}")]
    Package { message: String },

    /// Version string could not be parsed or mapped
    #[error("Invalid version: {message}")]
    InvalidVersion { message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A step of the pipeline failed
    #[error("{phase} phase failed: {source}")]
    PhaseFailed {
        phase: Phase,
        #[source]
        source: Box<Error>,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl Error {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new unsupported variant error for a lookup table
    pub fn unsupported<K: fmt::Display>(table: &'static str, key: K) -> Self {
        Self::Unsupported {
            table,
            key: key.to_string(),
        }
    }

    /// Create a new source control error
    pub fn source_control<S: Into<String>>(message: S) -> Self {
        Self::SourceControl {
            message: message.into(),
        }
    }

    /// Create a new packaging error
    pub fn package<S: Into<String>>(message: S) -> Self {
        Self::Package {
            message: message.into(),
        }
    }

    /// Create a new version error
    pub fn invalid_version<S: Into<String>>(message: S) -> Self {
        Self::InvalidVersion {
            message: message.into(),
        }
    }

    /// Attach the failing phase to an error
    pub fn in_phase(self, phase: Phase) -> Self {
        match self {
            already @ Self::PhaseFailed { .. } => already,
            other => Self::PhaseFailed {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// Phase that produced this error, if known
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::PhaseFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::configuration("cppstd must be at least 14");
        assert!(matches!(error, Error::Configuration { .. }));
        assert_eq!(
            error.to_string(),
            "Invalid configuration: cppstd must be at least 14"
        );
    }

    #[test]
    fn test_missing_libraries_message() {
        let error = Error::MissingLibraries {
            expected: 1,
            found: 0,
            dir: PathBuf::from("out"),
        };
        let text = error.to_string();
        assert!(text.starts_with(MISSING_LIBS_MESSAGE));
        assert!(text.contains("expected 1, found 0"));
    }

    #[test]
    fn test_tool_failure_message() {
        let error = Error::ToolFailed {
            command: "make -R".to_string(),
            code: Some(2),
        };
        assert_eq!(error.to_string(), "`make -R` failed with exit code 2");
    }

    #[test]
    fn test_phase_is_attached_once() {
        let error = Error::package("boom")
            .in_phase(Phase::Package)
            .in_phase(Phase::Archive);
        assert_eq!(error.phase(), Some(Phase::Package));
        assert_eq!(error.to_string(), "package phase failed: Packaging error: boom");
    }
}
