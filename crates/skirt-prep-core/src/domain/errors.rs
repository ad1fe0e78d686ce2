use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PrepResult<T> = Result<T, PrepError>;
pub type IngestResult<T> = PrepResult<T>;
pub type AssemblyResult<T> = PrepResult<T>;
pub type ValidationResult<T> = PrepResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrepErrorCategory {
    Success,
    ResourceResolutionError,
    SchemaError,
    EmptyResultError,
    ConsistencyError,
    ArtifactMissingError,
    AssemblyError,
    IoSystemError,
    InternalError,
}

impl PrepErrorCategory {
    pub const fn exit_status(self) -> ExitStatusMapping {
        match self {
            Self::Success => ExitStatusMapping {
                exit_code: 0,
                rust_category: "Success",
                severity_class: "OK",
            },
            Self::ResourceResolutionError => ExitStatusMapping {
                exit_code: 2,
                rust_category: "ResourceResolutionError",
                severity_class: "INPUT_FATAL",
            },
            Self::SchemaError => ExitStatusMapping {
                exit_code: 3,
                rust_category: "SchemaError",
                severity_class: "INPUT_FATAL",
            },
            Self::EmptyResultError => ExitStatusMapping {
                exit_code: 4,
                rust_category: "EmptyResultError",
                severity_class: "RUN_FATAL",
            },
            Self::ConsistencyError => ExitStatusMapping {
                exit_code: 5,
                rust_category: "ConsistencyError",
                severity_class: "CHECK_FATAL",
            },
            Self::ArtifactMissingError => ExitStatusMapping {
                exit_code: 6,
                rust_category: "ArtifactMissingError",
                severity_class: "CHECK_FATAL",
            },
            Self::AssemblyError => ExitStatusMapping {
                exit_code: 7,
                rust_category: "AssemblyError",
                severity_class: "RUN_FATAL",
            },
            Self::IoSystemError => ExitStatusMapping {
                exit_code: 8,
                rust_category: "IoSystemError",
                severity_class: "IO_FATAL",
            },
            Self::InternalError => ExitStatusMapping {
                exit_code: 9,
                rust_category: "InternalError",
                severity_class: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_status().exit_code
    }

    pub const fn rust_category(self) -> &'static str {
        self.exit_status().rust_category
    }

    pub const fn severity_class(self) -> &'static str {
        self.exit_status().severity_class
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusMapping {
    pub exit_code: i32,
    pub rust_category: &'static str,
    pub severity_class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepError {
    category: PrepErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl PrepError {
    pub fn new(
        category: PrepErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn resource_resolution(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            PrepErrorCategory::ResourceResolutionError,
            placeholder,
            message,
        )
    }

    pub fn schema(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::SchemaError, placeholder, message)
    }

    pub fn empty_result(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::EmptyResultError, placeholder, message)
    }

    pub fn consistency(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::ConsistencyError, placeholder, message)
    }

    pub fn artifact_missing(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::ArtifactMissingError, placeholder, message)
    }

    pub fn assembly(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::AssemblyError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PrepErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> PrepErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for PrepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.rust_category(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for PrepError {}

#[cfg(test)]
mod tests {
    use super::{PrepError, PrepErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (PrepErrorCategory::Success, 0, "Success", "OK"),
            (
                PrepErrorCategory::ResourceResolutionError,
                2,
                "ResourceResolutionError",
                "INPUT_FATAL",
            ),
            (PrepErrorCategory::SchemaError, 3, "SchemaError", "INPUT_FATAL"),
            (
                PrepErrorCategory::EmptyResultError,
                4,
                "EmptyResultError",
                "RUN_FATAL",
            ),
            (
                PrepErrorCategory::ConsistencyError,
                5,
                "ConsistencyError",
                "CHECK_FATAL",
            ),
            (
                PrepErrorCategory::ArtifactMissingError,
                6,
                "ArtifactMissingError",
                "CHECK_FATAL",
            ),
            (PrepErrorCategory::AssemblyError, 7, "AssemblyError", "RUN_FATAL"),
            (PrepErrorCategory::IoSystemError, 8, "IoSystemError", "IO_FATAL"),
            (PrepErrorCategory::InternalError, 9, "InternalError", "SYS_FATAL"),
        ];

        for (category, exit_code, rust_category, severity_class) in cases {
            let mapping = category.exit_status();
            assert_eq!(mapping.exit_code, exit_code);
            assert_eq!(mapping.rust_category, rust_category);
            assert_eq!(mapping.severity_class, severity_class);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = PrepError::resource_resolution(
            "INPUT.SNAPSHOT_GLOB",
            "no snapshot files found for glob 'data/snapshot_600.*.json'",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.SNAPSHOT_GLOB] no snapshot files found for glob 'data/snapshot_600.*.json'"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
    }
}
