// Locates, opens and validates the MagickWand shared library.

pub mod candidates;

use std::fmt;
use std::path::Path;

use libloading::Library;
use tracing::{debug, info, trace};

use crate::config::merged::LoaderConfig;
use crate::error::{Attempt, LoadError};
use crate::ffi::magick_wand_sys::GetVersionFn;
use crate::version::MagickVersion;
use candidates::Candidate;

/// Symbols a candidate must export before it is accepted.
pub const CANARY_SYMBOLS: &[&str] = &["MagickGetVersion", "MagickWandGenesis", "NewMagickWand"];

/// Oldest `MagickLibVersion` this binding accepts (ImageMagick 6.0.0).
pub const MIN_SUPPORTED_VERSION: usize = 0x600;

/// An opened shared library. Dropping it unloads the library, so it must
/// outlive every function pointer resolved from it.
pub struct LoadedLibrary {
    path: String,
    library: Library,
}

impl LoadedLibrary {
    /// Open `candidate` with the platform dynamic loader.
    pub fn open(candidate: &Candidate) -> Result<Self, String> {
        // SAFETY: loading ImageMagick runs its static initializers, which have
        // no preconditions on the host process.
        let library = unsafe { Library::new(&candidate.path) }.map_err(|e| e.to_string())?;
        Ok(LoadedLibrary {
            path: candidate.to_string(),
            library,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        // SAFETY: the symbol is only looked up, never called, here.
        unsafe { self.library.get::<*const ()>(symbol.as_bytes()) }.is_ok()
    }

    /// Resolve `symbol` as `T`, or `None` when it is not exported.
    ///
    /// `T` must be the function-pointer type declared for this symbol in
    /// `magick_wand_sys`; the table module is the only caller.
    pub(crate) fn optional<T: Copy>(&self, symbol: &str) -> Option<T> {
        // SAFETY: every call site pairs the name with its declared signature.
        unsafe { self.library.get::<T>(symbol.as_bytes()) }
            .ok()
            .map(|s| *s)
    }

    pub(crate) fn required<T: Copy>(&self, symbol: &'static str) -> Result<T, LoadError> {
        self.optional(symbol).ok_or_else(|| LoadError::MissingSymbol {
            library: self.path.clone(),
            symbol,
        })
    }
}

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Try `candidates` in order and return the first value `probe` accepts.
///
/// Every rejection is recorded, so the failure lists each path with the
/// reason it was skipped.
pub fn search<T, F>(candidates: &[Candidate], mut probe: F) -> Result<(T, Candidate), LoadError>
where
    F: FnMut(&Candidate) -> Result<T, String>,
{
    let mut tried = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match probe(candidate) {
            Ok(value) => {
                debug!(path = %candidate, origin = ?candidate.origin, "MagickWand candidate accepted");
                return Ok((value, candidate.clone()));
            }
            Err(reason) => {
                trace!(path = %candidate, %reason, "MagickWand candidate rejected");
                tried.push(Attempt {
                    path: candidate.to_string(),
                    reason,
                });
            }
        }
    }
    Err(LoadError::LibraryNotFound { tried })
}

/// Open a candidate and check it is a usable MagickWand build.
pub fn probe(candidate: &Candidate) -> Result<(LoadedLibrary, MagickVersion), String> {
    if candidate.is_explicit_path() && !Path::new(&candidate.path).exists() {
        return Err("file does not exist".to_string());
    }

    let library = LoadedLibrary::open(candidate)?;

    if let Some(missing) = CANARY_SYMBOLS.iter().find(|s| !library.has_symbol(s)) {
        return Err(format!("missing canary symbol {missing}"));
    }

    let get_version: GetVersionFn = library
        .optional("MagickGetVersion")
        .ok_or_else(|| "missing canary symbol MagickGetVersion".to_string())?;
    // SAFETY: MagickGetVersion only writes the version number and returns a
    // static string; it is callable before genesis.
    let version = unsafe { MagickVersion::query(get_version) };

    if version.number < MIN_SUPPORTED_VERSION {
        return Err(format!(
            "unsupported library version {:#x} ({})",
            version.number, version.text
        ));
    }

    Ok((library, version))
}

/// Locate the first usable library for `config`.
pub fn locate(config: &LoaderConfig) -> Result<(LoadedLibrary, MagickVersion), LoadError> {
    let candidates = candidates::candidates(config);
    debug!(count = candidates.len(), "searching for MagickWand library");

    let ((library, version), chosen) = search(&candidates, probe)?;
    info!(
        path = %chosen,
        version = %version.text,
        "loaded MagickWand library"
    );
    Ok((library, version))
}
