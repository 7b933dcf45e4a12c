use std::fmt;

#[derive(Debug)]
pub enum CrosscheckError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty suffix, malformed prefix, etc.).
    ConfigValidation(String),
    /// An output invariant was violated. Always a bug: the engine refuses to
    /// hand back a partial result.
    InternalInvariant(String),
}

impl fmt::Display for CrosscheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InternalInvariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for CrosscheckError {}
