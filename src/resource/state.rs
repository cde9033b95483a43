// Global Library State: reference count, one-time genesis, one-time teardown.
//
// MagickWand has process-wide setup (`MagickWandGenesis`) and teardown
// (`MagickWandTerminus`). Every live handle holds one reference. Genesis runs
// on the first acquire. Teardown never runs on a zero crossing, only from
// `shutdown`, which the process-exit hook calls once for the global
// instance.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, trace, warn};

use crate::config::merged::LoaderConfig;
use crate::error::{LoadError, Result, WandError};
use crate::ffi::function_table::{Capability, FunctionTable};
use crate::ffi::magick_wand_sys::MAGICK_FALSE;
use crate::loader::{self, LoadedLibrary};
use crate::resource::limits::LimitType;
use crate::version::MagickVersion;

struct Lifecycle {
    reference_count: usize,
    initialized: bool,
}

pub struct LibraryState {
    table: FunctionTable,
    version: MagickVersion,
    resource_limits: BTreeMap<LimitType, u64>,
    lifecycle: Mutex<Lifecycle>,
    // Native construct/call/destroy hold it shared; `shutdown` takes it
    // exclusively around `MagickWandTerminus`.
    teardown: RwLock<()>,
    terminated: AtomicBool,
    // Last field: dropped after `table`, whose pointers point into it.
    library: Option<LoadedLibrary>,
}

impl LibraryState {
    /// Locate and bind a library according to `config`.
    pub fn load(config: &LoaderConfig) -> std::result::Result<Self, LoadError> {
        let (library, version) = loader::locate(config)?;
        let table = FunctionTable::bind(&library)?;
        Ok(LibraryState {
            table,
            version,
            resource_limits: config.resource_limits.clone(),
            lifecycle: Mutex::new(Lifecycle {
                reference_count: 0,
                initialized: false,
            }),
            teardown: RwLock::new(()),
            terminated: AtomicBool::new(false),
            library: Some(library),
        })
    }

    /// Wrap an already-resolved table (a statically linked library, or an
    /// in-process implementation).
    ///
    /// # Safety
    /// Every pointer in `table` must implement the MagickWand C contract of
    /// the symbol it stands for, and stay callable for the state's lifetime.
    pub unsafe fn from_table(table: FunctionTable) -> Self {
        let version = unsafe { MagickVersion::query(table.core.get_version) };
        LibraryState {
            table,
            version,
            resource_limits: BTreeMap::new(),
            lifecycle: Mutex::new(Lifecycle {
                reference_count: 0,
                initialized: false,
            }),
            teardown: RwLock::new(()),
            terminated: AtomicBool::new(false),
            library: None,
        }
    }

    /// Limits applied right after genesis.
    pub fn with_resource_limits(mut self, limits: BTreeMap<LimitType, u64>) -> Self {
        self.resource_limits = limits;
        self
    }

    pub fn table(&self) -> &FunctionTable {
        &self.table
    }

    pub fn version(&self) -> &MagickVersion {
        &self.version
    }

    /// Path of the loaded shared library, if this state was loaded from disk.
    pub fn library_path(&self) -> Option<&str> {
        self.library.as_ref().map(LoadedLibrary::path)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.table.supports(capability)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        // The counters are only mutated while the lock is held and never
        // left half-updated, so a poisoned lock still guards valid data.
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reference_count(&self) -> usize {
        self.lock().reference_count
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Shared hold that keeps `shutdown` from running `MagickWandTerminus`
    /// until it is dropped. `None` once the library has been torn down.
    ///
    /// Lock order: this hold first, then the lifecycle lock.
    pub fn hold(&self) -> Option<RwLockReadGuard<'_, ()>> {
        let hold = self.teardown.read().unwrap_or_else(PoisonError::into_inner);
        (!self.is_terminated()).then_some(hold)
    }

    /// Take one reference, running genesis if this is the first.
    pub fn acquire(&self) -> Result<()> {
        let mut lifecycle = self.lock();
        if self.is_terminated() {
            return Err(WandError::Terminated);
        }
        if !lifecycle.initialized {
            debug!(version = %self.version.text, "MagickWandGenesis");
            // SAFETY: guarded by the lifecycle lock; runs once per state.
            unsafe { (self.table.core.genesis)() };
            lifecycle.initialized = true;
            self.apply_resource_limits();
        }
        lifecycle.reference_count += 1;
        trace!(count = lifecycle.reference_count, "MagickWand reference acquired");
        Ok(())
    }

    /// Drop one reference. Reaching zero does not tear the library down.
    pub fn release(&self) -> Result<()> {
        let mut lifecycle = self.lock();
        if lifecycle.reference_count == 0 {
            return Err(WandError::reference_count(
                "release called while reference count is already zero",
            ));
        }
        lifecycle.reference_count -= 1;
        trace!(count = lifecycle.reference_count, "MagickWand reference released");
        Ok(())
    }

    /// Run `MagickWandTerminus` if the library was initialized. Only the
    /// first call does anything; later acquires fail with `Terminated`.
    ///
    /// Returns `true` if this call ran the native teardown.
    /// Waits for native construct/call/destroy in flight on other threads.
    /// Must not be called while this thread holds [`LibraryState::hold`].
    pub fn shutdown(&self) -> bool {
        let _exclusive = self.teardown.write().unwrap_or_else(PoisonError::into_inner);
        if self.terminated.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut lifecycle = self.lock();
        if !lifecycle.initialized {
            return false;
        }
        if lifecycle.reference_count > 0 {
            debug!(
                leaked = lifecycle.reference_count,
                "tearing down MagickWand with live handles"
            );
        }

        let instantiated = match self.table.optional.is_instantiated {
            Some(is_instantiated) => {
                // SAFETY: argument-less query of global state.
                let status = unsafe { is_instantiated() };
                status != MAGICK_FALSE
            }
            None => true,
        };
        if instantiated {
            debug!("MagickWandTerminus");
            // SAFETY: terminated flag guarantees a single call.
            unsafe { (self.table.core.terminus)() };
        }
        lifecycle.initialized = false;
        instantiated
    }

    /// Hold a reference for as long as the guard lives.
    pub fn guard(&self) -> Result<LibraryGuard<'_>> {
        self.acquire()?;
        Ok(LibraryGuard { state: self })
    }

    /// Seed the library's random number generator.
    pub fn set_random_seed(&self, seed: u64) -> Result<()> {
        let set_seed = self
            .table
            .optional
            .set_seed
            .ok_or(WandError::Unsupported(Capability::RandomSeed.symbol()))?;
        let _guard = self.guard()?;
        let _live = self.hold().ok_or(WandError::Terminated)?;
        // SAFETY: plain value argument; truncation matches `unsigned long`.
        unsafe { set_seed(seed as libc::c_ulong) };
        Ok(())
    }

    fn apply_resource_limits(&self) {
        let major = self.version.major();
        for (&limit, &value) in &self.resource_limits {
            // SAFETY: called after genesis with a version-correct enum value.
            let ok = unsafe { (self.table.core.set_resource_limit)(limit.to_native(major), value) };
            if ok == MAGICK_FALSE {
                warn!(limit = limit.name(), value, "MagickSetResourceLimit rejected configured limit");
            } else {
                debug!(limit = limit.name(), value, "applied resource limit");
            }
        }
    }
}

impl fmt::Debug for LibraryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lock();
        f.debug_struct("LibraryState")
            .field("version", &self.version.text)
            .field("library", &self.library_path())
            .field("reference_count", &lifecycle.reference_count)
            .field("initialized", &lifecycle.initialized)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// A reference on the library held without owning a native handle.
pub struct LibraryGuard<'a> {
    state: &'a LibraryState,
}

impl LibraryGuard<'_> {
    pub fn state(&self) -> &LibraryState {
        self.state
    }
}

impl Drop for LibraryGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.state.release() {
            tracing::error!(error = %e, "failed to release library guard");
        }
    }
}

static GLOBAL: OnceLock<std::result::Result<Arc<LibraryState>, LoadError>> = OnceLock::new();

/// The process-wide library, loaded on first call from the environment
/// (`MAGICK_HOME`, `WAND_MAGICK_LIBRARY_SUFFIX`, `MAGICK_WAND_SETTINGS`).
///
/// Later calls return the same state, or replay the same load failure.
pub fn library() -> Result<Arc<LibraryState>> {
    global_with(|| LoaderConfig::from_env().map_err(|e| LoadError::Config(e.to_string())))
}

/// Load the process-wide library with an explicit configuration. Has no
/// effect (beyond returning the existing state) once the library is loaded.
pub fn initialize(config: LoaderConfig) -> Result<Arc<LibraryState>> {
    if GLOBAL.get().is_some() {
        debug!("MagickWand library already loaded; ignoring configuration");
    }
    global_with(|| Ok(config))
}

fn global_with<F>(config: F) -> Result<Arc<LibraryState>>
where
    F: FnOnce() -> std::result::Result<LoaderConfig, LoadError>,
{
    GLOBAL
        .get_or_init(|| {
            let config = config()?;
            let state = LibraryState::load(&config)?;
            register_exit_hook();
            Ok(Arc::new(state))
        })
        .clone()
        .map_err(WandError::from)
}

extern "C" fn run_exit_hook() {
    if let Some(Ok(state)) = GLOBAL.get() {
        state.shutdown();
    }
}

fn register_exit_hook() {
    // SAFETY: `run_exit_hook` captures nothing and only touches `GLOBAL`.
    if unsafe { libc::atexit(run_exit_hook) } != 0 {
        warn!("failed to register MagickWand exit hook; MagickWandTerminus will not run");
    }
}
