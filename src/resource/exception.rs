// Translation of the native exception side channel.
//
// MagickWand reports failures through a per-handle `ExceptionType` code plus
// a message. The code encodes both a severity band (warning 300, error 400,
// fatal 700) and a domain offset inside that band.

use std::fmt;

use crate::ffi::function_table::FunctionTable;
use crate::ffi::magick_wand_sys::{
    ERROR_EXCEPTION, ExceptionType, FATAL_ERROR_EXCEPTION, UNDEFINED_EXCEPTION, WARNING_EXCEPTION,
};
use crate::resource::kind::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Operation completed; surfaced as a logged warning.
    Warning,
    /// Operation failed; the handle is still usable.
    Error,
    /// The handle is no longer usable.
    Fatal,
}

impl Severity {
    /// `None` for `UndefinedException` (no pending exception).
    pub fn from_code(code: ExceptionType) -> Option<Self> {
        match code {
            c if c <= UNDEFINED_EXCEPTION => None,
            c if c < ERROR_EXCEPTION => Some(Severity::Warning),
            c if c < FATAL_ERROR_EXCEPTION => Some(Severity::Error),
            _ => Some(Severity::Fatal),
        }
    }

    fn base(self) -> ExceptionType {
        match self {
            Severity::Warning => WARNING_EXCEPTION,
            Severity::Error => ERROR_EXCEPTION,
            Severity::Fatal => FATAL_ERROR_EXCEPTION,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "FatalError",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionDomain {
    ResourceLimit,
    Type,
    Option,
    Delegate,
    MissingDelegate,
    CorruptImage,
    FileOpen,
    Blob,
    Stream,
    Cache,
    Coder,
    Filter,
    Module,
    Draw,
    Image,
    Wand,
    Random,
    XServer,
    Monitor,
    Registry,
    Configure,
    Policy,
    /// A code with no known domain offset.
    Other(ExceptionType),
}

impl ExceptionDomain {
    pub fn from_code(code: ExceptionType) -> Self {
        let Some(severity) = Severity::from_code(code) else {
            return ExceptionDomain::Other(code);
        };
        match code - severity.base() {
            0 => ExceptionDomain::ResourceLimit,
            5 => ExceptionDomain::Type,
            10 => ExceptionDomain::Option,
            15 => ExceptionDomain::Delegate,
            20 => ExceptionDomain::MissingDelegate,
            25 => ExceptionDomain::CorruptImage,
            30 => ExceptionDomain::FileOpen,
            35 => ExceptionDomain::Blob,
            40 => ExceptionDomain::Stream,
            45 => ExceptionDomain::Cache,
            50 => ExceptionDomain::Coder,
            52 => ExceptionDomain::Filter,
            55 => ExceptionDomain::Module,
            60 => ExceptionDomain::Draw,
            65 => ExceptionDomain::Image,
            70 => ExceptionDomain::Wand,
            75 => ExceptionDomain::Random,
            80 => ExceptionDomain::XServer,
            85 => ExceptionDomain::Monitor,
            90 => ExceptionDomain::Registry,
            95 => ExceptionDomain::Configure,
            99 => ExceptionDomain::Policy,
            _ => ExceptionDomain::Other(code),
        }
    }
}

impl fmt::Display for ExceptionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionDomain::Other(_) => f.write_str(""),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// One exception read (and cleared) from a native handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeException {
    pub code: ExceptionType,
    pub severity: Severity,
    pub domain: ExceptionDomain,
    pub message: String,
}

impl NativeException {
    /// `None` when `code` means "no exception".
    pub fn new(code: ExceptionType, message: impl Into<String>) -> Option<Self> {
        let severity = Severity::from_code(code)?;
        Some(NativeException {
            code,
            severity,
            domain: ExceptionDomain::from_code(code),
            message: message.into(),
        })
    }

    /// A call returned `MagickFalse` without setting an exception.
    pub fn unreported(operation: &str) -> Self {
        let code = ERROR_EXCEPTION + 70;
        NativeException {
            code,
            severity: Severity::Error,
            domain: ExceptionDomain::Wand,
            message: format!("{operation} failed without reporting a reason"),
        }
    }

    /// ImageMagick-style type name, e.g. `FileOpenError`.
    pub fn kind_name(&self) -> String {
        format!("{}{}", self.domain, self.severity)
    }
}

impl fmt::Display for NativeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind_name(), self.code, self.message)
    }
}

/// Read and clear the pending exception on `raw`. The message buffer is
/// always relinquished, even when no exception is pending.
///
/// # Safety
/// `raw` must be a live handle of family `K` from `table`'s library.
pub unsafe fn take_exception<K: ResourceKind>(
    table: &FunctionTable,
    raw: *mut K::Raw,
) -> Option<NativeException> {
    let fns = K::fns(table);
    let mut code: ExceptionType = UNDEFINED_EXCEPTION;
    let message = unsafe {
        let description = (fns.get_exception)(raw, &mut code);
        table.core.take_string(description).unwrap_or_default()
    };
    let exception = NativeException::new(code, message)?;
    unsafe { (fns.clear_exception)(raw) };
    Some(exception)
}
