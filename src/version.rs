// Version and build information reported by the loaded library.

use std::ffi::CString;

use serde::Serialize;

use crate::error::Result;
use crate::ffi::function_table::borrowed_string;
use crate::ffi::magick_wand_sys::GetVersionFn;
use crate::resource::state::LibraryState;

/// `MagickLibVersion` plus the human-readable version string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MagickVersion {
    /// e.g. `0x711` for ImageMagick 7.1.1.
    pub number: usize,
    /// e.g. `ImageMagick 7.1.1-15 Q16-HDRI x86_64 ...`.
    pub text: String,
}

impl MagickVersion {
    /// Query the version through `MagickGetVersion`.
    ///
    /// # Safety
    /// `get_version` must be the library's `MagickGetVersion`.
    pub unsafe fn query(get_version: GetVersionFn) -> Self {
        let mut number: libc::size_t = 0;
        let text = unsafe { borrowed_string(get_version(&mut number)) }.unwrap_or_default();
        MagickVersion { number, text }
    }

    pub fn major(&self) -> usize {
        self.number >> 8
    }

    pub fn minor(&self) -> usize {
        (self.number >> 4) & 0xf
    }

    pub fn patch(&self) -> usize {
        self.number & 0xf
    }

    /// The release token of the version string, e.g. `7.1.1-15`.
    pub fn release(&self) -> Option<&str> {
        self.text.split_whitespace().nth(1)
    }
}

/// Everything the library reports about its build.
#[derive(Debug, Clone, Serialize)]
pub struct VersionReport {
    pub version: MagickVersion,
    pub release_date: String,
    pub quantum_depth: usize,
    pub quantum_range: usize,
    pub features: Vec<String>,
    pub delegates: Vec<String>,
    pub capabilities: Vec<String>,
}

impl VersionReport {
    pub fn query(state: &LibraryState) -> Result<Self> {
        // Configure options are read from configure.xml, which genesis loads.
        let _guard = state.guard()?;
        let core = &state.table().core;

        let mut quantum_depth: libc::size_t = 0;
        let mut quantum_range: libc::size_t = 0;
        // SAFETY: these return static strings and write through valid pointers.
        let release_date = unsafe {
            (core.get_quantum_depth)(&mut quantum_depth);
            (core.get_quantum_range)(&mut quantum_range);
            borrowed_string((core.get_release_date)())
        }
        .unwrap_or_default();

        Ok(VersionReport {
            version: state.version().clone(),
            release_date,
            quantum_depth,
            quantum_range,
            features: configure_list(state, "FEATURES")?,
            delegates: configure_list(state, "DELEGATES")?,
            capabilities: state
                .table()
                .capabilities()
                .into_iter()
                .map(|c| c.symbol().to_string())
                .collect(),
        })
    }
}

/// Whitespace-separated configure option, e.g. `FEATURES` or `DELEGATES`.
fn configure_list(state: &LibraryState, option: &str) -> Result<Vec<String>> {
    let core = &state.table().core;
    let option = CString::new(option)?;
    // SAFETY: the returned buffer is owned by the caller and relinquished by take_string.
    let value = unsafe { core.take_string((core.query_configure_option)(option.as_ptr())) };
    Ok(value
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect())
}

/// Image formats whose name matches the glob `pattern` (e.g. `"*"`, `"PNG*"`).
pub fn formats(state: &LibraryState, pattern: &str) -> Result<Vec<String>> {
    let _guard = state.guard()?;
    let core = &state.table().core;
    let pattern = CString::new(pattern)?;

    let mut count: libc::size_t = 0;
    // SAFETY: MagickQueryFormats returns an array of `count` caller-owned strings.
    let list = unsafe { (core.query_formats)(pattern.as_ptr(), &mut count) };
    if list.is_null() {
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        // SAFETY: i < count; each entry is relinquished exactly once.
        if let Some(name) = unsafe { core.take_string(*list.add(i)) } {
            out.push(name);
        }
    }
    unsafe { (core.relinquish_memory)(list as *mut libc::c_void) };
    Ok(out)
}
