//! Common error infrastructure for beacon-core.
//!
//! Two families of errors leave this crate:
//!
//! - [`Rejection`]: an expected, user-facing refusal (ceiling exceeded, too many
//!   effects, wrong owner). Rejections never leave partially mutated state
//!   behind for anyone but the caller that asked for in-place mutation.
//! - [`ConfigError`]: a malformed configuration or recipe entry detected at
//!   load time. Loaders skip the offending entry unless the error is fatal.
//!
//! Codec failures are defined next to the codec in `beacon-runtime`.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the same request may succeed with different inputs
/// - **Validation**: invalid input that should be rejected without retry
/// - **Fatal**: the engine cannot start or continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Recoverable error - retry with another input.
    ///
    /// Examples: effect level would exceed its ceiling, incompatible catalyst
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: unknown effect name, malformed cost formula
    Validation,

    /// Fatal error - required configuration is missing.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error must abort engine startup.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Common trait for all beacon-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait EngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

// ============================================================================
// Rejections
// ============================================================================

/// Business-rule refusal returned by combination, recipes and ownership checks.
///
/// The `Display` output is the message shown to the player.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// A merged or incremented level exceeds the configured ceiling.
    #[error("Overpowered {name}")]
    Overpowered { name: String },

    /// The merged bundle holds more kinds than allowed.
    #[error("Too many effects")]
    TooManyEffects { max: usize },

    /// The catalyst carries none of the recognized enchantments.
    #[error("Incompatible enchantments")]
    Incompatible,

    /// The actor does not own one of the bundles.
    #[error("You do not own the portable beacon")]
    NotOwner,

    /// The second input is neither a bundle nor a catalyst.
    #[error("Invalid combination")]
    InvalidCombination,
}

impl EngineError for Rejection {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Rejection::Overpowered { .. } | Rejection::TooManyEffects { .. } => {
                ErrorSeverity::Recoverable
            }
            Rejection::Incompatible | Rejection::InvalidCombination => ErrorSeverity::Validation,
            Rejection::NotOwner => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Rejection::Overpowered { .. } => "REJECT_OVERPOWERED",
            Rejection::TooManyEffects { .. } => "REJECT_TOO_MANY_EFFECTS",
            Rejection::Incompatible => "REJECT_INCOMPATIBLE",
            Rejection::NotOwner => "REJECT_NOT_OWNER",
            Rejection::InvalidCombination => "REJECT_INVALID_COMBINATION",
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Malformed configuration, recipe or formula detected at load time.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required default value is absent. Aborts engine startup.
    #[error("'{0}' in the default effect section cannot be missing")]
    MissingDefault(&'static str),

    #[error("{0} is not a valid potion effect")]
    UnknownEffect(String),

    #[error("unknown virtual effect key '{0}'")]
    UnknownEffectKey(String),

    #[error("invalid formula '{formula}': {reason}")]
    InvalidFormula { formula: String, reason: String },

    #[error("invalid value at '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("unknown special operation '{0}'")]
    UnknownSpecialOperation(String),

    #[error("unknown station type '{0}'")]
    UnknownStation(String),

    #[error("unknown modification action '{0}'")]
    UnknownAction(String),
}

impl ConfigError {
    pub fn invalid_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl EngineError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ConfigError::MissingDefault(_) => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingDefault(_) => "CONFIG_MISSING_DEFAULT",
            ConfigError::UnknownEffect(_) => "CONFIG_UNKNOWN_EFFECT",
            ConfigError::UnknownEffectKey(_) => "CONFIG_UNKNOWN_EFFECT_KEY",
            ConfigError::InvalidFormula { .. } => "CONFIG_INVALID_FORMULA",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::UnknownSpecialOperation(_) => "CONFIG_UNKNOWN_SPECIAL_OPERATION",
            ConfigError::UnknownStation(_) => "CONFIG_UNKNOWN_STATION",
            ConfigError::UnknownAction(_) => "CONFIG_UNKNOWN_ACTION",
        }
    }
}
