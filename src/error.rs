//! Structured Error Handling for fuzzy-greenhouse
//!
//! Provides a unified error type with:
//! - Error codes for programmatic handling
//! - Structured, JSON-friendly error payloads
//! - Context preservation through error chains
//! - A recoverable/fatal classification used by the inference fallback path
//!
//! # Error Categories
//!
//! - Inference (1xxx): `DomainOutOfRange`, `NoRuleFired`, `EmptyRuleBase`, ...
//! - Persistence (2xxx): `StoreError`, `InvalidPersistedTable`, ...
//! - Configuration (3xxx)
//! - Internal (9xxx)
//!
//! # Example
//!
//! ```rust,ignore
//! use fuzzy_greenhouse::error::{GreenhouseError, ErrorCode};
//!
//! fn check_shape(len: usize) -> Result<(), GreenhouseError> {
//!     if len != 225 {
//!         return Err(GreenhouseError::invalid_table(format!("expected 225 values, got {}", len))
//!             .with_context("len", len.to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Inference errors (1xxx)
    /// Generic inference error
    InferenceError = 1000,
    /// Input outside a variable's declared bounds
    DomainOutOfRange = 1001,
    /// Zero total firing strength for an output
    NoRuleFired = 1002,
    /// Inference attempted with an empty rule base
    EmptyRuleBase = 1003,
    /// Rule references a variable the engine does not know
    UnknownVariable = 1004,
    /// Rule references a label the variable does not define
    UnknownLabel = 1005,
    /// Rule with no antecedent terms
    EmptyAntecedent = 1006,

    // Persistence errors (2xxx)
    /// Generic store error
    StoreError = 2000,
    /// Persisted table has the wrong shape or encoding
    InvalidPersistedTable = 2001,
    /// No persisted table exists
    TableNotFound = 2002,

    // Config errors (3xxx)
    /// Generic config error
    ConfigError = 3000,
    /// Invalid config syntax
    InvalidConfigSyntax = 3001,
    /// Invalid config value
    InvalidConfigValue = 3002,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InferenceError => "Inference error",
            ErrorCode::DomainOutOfRange => "Input outside variable domain",
            ErrorCode::NoRuleFired => "No rule fired",
            ErrorCode::EmptyRuleBase => "Empty rule base",
            ErrorCode::UnknownVariable => "Unknown variable",
            ErrorCode::UnknownLabel => "Unknown label",
            ErrorCode::EmptyAntecedent => "Rule has no antecedent",

            ErrorCode::StoreError => "Store error",
            ErrorCode::InvalidPersistedTable => "Invalid persisted table",
            ErrorCode::TableNotFound => "Table not found",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Whether the inference path recovers from this error locally
    /// (clamping or the 0.0 channel fallback) instead of surfacing it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::DomainOutOfRange | ErrorCode::NoRuleFired | ErrorCode::EmptyRuleBase
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Source location (file:line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Stack of error causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for fuzzy-greenhouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl GreenhouseError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    // ========================================================================
    // Factory methods for common error types
    // ========================================================================

    /// Input outside a variable's declared domain
    pub fn domain_out_of_range(variable: &str, value: f64, min: f64, max: f64) -> Self {
        Self::new(
            ErrorCode::DomainOutOfRange,
            format!("{} = {} outside [{}, {}]", variable, value, min, max),
        )
    }

    /// Zero total firing strength for an output
    pub fn no_rule_fired(output: &str) -> Self {
        Self::new(
            ErrorCode::NoRuleFired,
            format!("no rule fired for output '{}'", output),
        )
    }

    /// Inference attempted with no rules
    pub fn empty_rule_base() -> Self {
        Self::new(ErrorCode::EmptyRuleBase, "rule base is empty")
    }

    /// Rule references an unknown variable
    pub fn unknown_variable(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownVariable,
            format!("unknown variable '{}'", name),
        )
    }

    /// Rule references an unknown label
    pub fn unknown_label(variable: &str, label: &str) -> Self {
        Self::new(
            ErrorCode::UnknownLabel,
            format!("variable '{}' has no label '{}'", variable, label),
        )
    }

    /// Rule without antecedent terms
    pub fn empty_antecedent() -> Self {
        Self::new(
            ErrorCode::EmptyAntecedent,
            "firing strength is undefined for a rule without antecedent terms",
        )
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    /// Persisted table failed shape or encoding validation
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPersistedTable, message).with_hint(
            "treat the store as empty by removing the persisted table, or abort",
        )
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add a cause to the error chain
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.causes.push(cause.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// See [`ErrorCode::is_recoverable`]
    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }
}

impl fmt::Display for GreenhouseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
            if !ctx.causes.is_empty() {
                write!(f, "\nCaused by:")?;
                for cause in &ctx.causes {
                    write!(f, "\n  - {}", cause)?;
                }
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for GreenhouseError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for GreenhouseError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let code = match err.kind() {
            ErrorKind::NotFound => ErrorCode::TableNotFound,
            ErrorKind::UnexpectedEof | ErrorKind::InvalidData => ErrorCode::InvalidPersistedTable,
            _ => ErrorCode::StoreError,
        };
        GreenhouseError::new(code, err.to_string())
    }
}

impl From<rusqlite::Error> for GreenhouseError {
    fn from(err: rusqlite::Error) -> Self {
        GreenhouseError::store(err.to_string()).with_context("backend", "sqlite")
    }
}

impl From<toml::de::Error> for GreenhouseError {
    fn from(err: toml::de::Error) -> Self {
        GreenhouseError::config(err.to_string()).with_code(ErrorCode::InvalidConfigSyntax)
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using GreenhouseError
pub type GreenhouseResult<T> = Result<T, GreenhouseError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Create a GreenhouseError with context from the current location
#[macro_export]
macro_rules! greenhouse_error {
    ($code:expr, $msg:expr) => {
        $crate::error::GreenhouseError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::GreenhouseError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

/// Bail out early with an error
#[macro_export]
macro_rules! greenhouse_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::greenhouse_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::greenhouse_error!($code, $fmt, $($arg)*))
    };
}

/// Ensure a condition holds, or return an error
#[macro_export]
macro_rules! greenhouse_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::greenhouse_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::greenhouse_bail!($code, $fmt, $($arg)*);
        }
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = GreenhouseError::no_rule_fired("fan");
        assert_eq!(err.code, ErrorCode::NoRuleFired);
        assert!(err.message.contains("fan"));
    }

    #[test]
    fn test_error_with_context() {
        let err = GreenhouseError::invalid_table("bad shape")
            .with_context("expected", "225")
            .with_context("found", "224");

        let ctx = err.context.as_ref().unwrap();
        assert_eq!(ctx.fields.get("expected"), Some(&"225".to_string()));
        assert_eq!(ctx.fields.get("found"), Some(&"224".to_string()));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_error_with_cause() {
        let err = GreenhouseError::store("failed to write")
            .with_cause("disk full")
            .with_cause("no space left");

        let ctx = err.context.as_ref().unwrap();
        assert_eq!(ctx.causes.len(), 2);
        let rendered = err.to_string();
        assert!(rendered.contains("Caused by:"));
        assert!(rendered.contains("disk full"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(ErrorCode::NoRuleFired.is_recoverable());
        assert!(ErrorCode::EmptyRuleBase.is_recoverable());
        assert!(ErrorCode::DomainOutOfRange.is_recoverable());
        assert!(!ErrorCode::InvalidPersistedTable.is_recoverable());
        assert!(!ErrorCode::StoreError.is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::DomainOutOfRange.code(), 1001);
        assert_eq!(ErrorCode::InvalidPersistedTable.code(), 2001);
        assert_eq!(ErrorCode::InternalError.code(), 9000);
    }

    #[test]
    fn test_to_json() {
        let err = GreenhouseError::empty_rule_base();
        let json = err.to_json();
        assert!(json.contains("EMPTY_RULE_BASE"));
        let back: GreenhouseError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GreenhouseError = io.into();
        assert_eq!(err.code, ErrorCode::TableNotFound);
    }

    #[test]
    fn test_macros() {
        fn check(len: usize) -> GreenhouseResult<()> {
            greenhouse_ensure!(len == 225, ErrorCode::InvalidPersistedTable, "got {} values", len);
            Ok(())
        }

        assert!(check(225).is_ok());
        let err = check(3).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPersistedTable);
        assert!(err.context.unwrap().location.unwrap().contains("error.rs"));
    }
}
