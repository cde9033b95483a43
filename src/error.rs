use std::fmt;

use thiserror::Error;

use crate::resource::exception::NativeException;
use crate::resource::kind::ResourceTag;

/// One rejected loader candidate and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.reason)
    }
}

fn join_attempts(tried: &[Attempt]) -> String {
    if tried.is_empty() {
        return "<no candidates>".to_string();
    }
    tried
        .iter()
        .map(Attempt::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loader failures. `Clone` so the process-wide cache can hand the same
/// failure to every caller.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error(
        "MagickWand shared library not found (set MAGICK_HOME or WAND_MAGICK_LIBRARY_SUFFIX); tried paths: {}",
        join_attempts(.tried)
    )]
    LibraryNotFound { tried: Vec<Attempt> },

    #[error("MagickWand library '{library}' is missing required symbol '{symbol}'")]
    MissingSymbol {
        library: String,
        symbol: &'static str,
    },

    #[error("Loader configuration error: {0}")]
    Config(String),
}

impl LoadError {
    /// Paths tried before giving up; empty for other variants.
    pub fn tried(&self) -> &[Attempt] {
        match self {
            LoadError::LibraryNotFound { tried } => tried,
            _ => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum WandError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{tag} resource is destroyed already")]
    DestroyedResource { tag: ResourceTag },

    #[error("MagickWand error: {0}")]
    Native(NativeException),

    #[error("MagickWand fatal error (handle released): {0}")]
    NativeFatal(NativeException),

    #[error("{0} is not supported by the loaded MagickWand library version")]
    Unsupported(&'static str),

    #[error("MagickWand library has been terminated")]
    Terminated,

    #[error("Reference count error: {0}")]
    ReferenceCountError(String),

    #[error("Null handle: {0}")]
    NullHandle(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`WandError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl WandError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a reference count error.
    reference_count => ReferenceCountError,
    /// Create a null handle error.
    null_handle => NullHandle,
    /// Create an invalid argument error.
    invalid_argument => InvalidArgument,
}

impl WandError {
    /// The native exception carried by `Native` / `NativeFatal`, if any.
    pub fn native(&self) -> Option<&NativeException> {
        match self {
            WandError::Native(e) | WandError::NativeFatal(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_destroyed_resource(&self) -> bool {
        matches!(self, WandError::DestroyedResource { .. })
    }
}

impl From<serde_yml::Error> for WandError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<std::ffi::NulError> for WandError {
    fn from(e: std::ffi::NulError) -> Self {
        Self::InvalidArgument(format!("string contains an interior NUL byte: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, WandError>;
