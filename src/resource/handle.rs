// Safe owner of one native handle (RAII Drop, idempotent destroy).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::error::{Result, WandError};
use crate::ffi::function_table::FunctionTable;
use crate::ffi::magick_wand_sys::{MAGICK_FALSE, MagickBooleanType};
use crate::resource::exception::{NativeException, Severity, take_exception};
use crate::resource::kind::ResourceKind;
use crate::resource::state::LibraryState;

/// Owns exactly one native handle of family `K`.
///
/// The handle is released exactly once: by [`Resource::destroy`], by a fatal
/// native error, or by `Drop` if neither happened. After release the
/// resource is Destroyed and every operation except `destroy` fails with
/// [`WandError::DestroyedResource`].
pub struct Resource<K: ResourceKind> {
    // `Cell` so that a fatal error seen by a `&self` query can still release
    // the handle.
    handle: Cell<Option<NonNull<K::Raw>>>,
    state: Arc<LibraryState>,
    warnings: RefCell<Vec<NativeException>>,
    _kind: PhantomData<K>,
}

// A handle may move to another thread; it is never shared (no Sync).
unsafe impl<K: ResourceKind> Send for Resource<K> {}

impl<K: ResourceKind> Resource<K> {
    /// Acquire the library, run `construct`, and take ownership of the
    /// returned handle.
    ///
    /// If the constructor returns NULL, or an invalid handle, the library
    /// reference is rolled back. If the new handle reports an error, it is
    /// destroyed (which also rolls back) and the error is returned.
    pub fn create_with<F>(state: &Arc<LibraryState>, construct: F) -> Result<Self>
    where
        F: FnOnce(&FunctionTable) -> *mut K::Raw,
    {
        let handle = {
            let _live = state.hold().ok_or(WandError::Terminated)?;
            state.acquire()?;
            let table = state.table();

            let Some(handle) = NonNull::new(construct(table)) else {
                state.release()?;
                return Err(WandError::null_handle(format!(
                    "native {} constructor returned NULL",
                    K::TAG
                )));
            };

            // SAFETY: the pointer is non-null and was just returned by the library.
            if unsafe { (K::fns(table).is_valid)(handle.as_ptr()) } == MAGICK_FALSE {
                // Not a handle of this family, so it is never passed to the
                // family's destructor. It leaks.
                state.release()?;
                return Err(WandError::null_handle(format!(
                    "native {} constructor returned an invalid handle",
                    K::TAG
                )));
            }
            handle
        };

        let resource = Resource {
            handle: Cell::new(Some(handle)),
            state: Arc::clone(state),
            warnings: RefCell::new(Vec::new()),
            _kind: PhantomData,
        };
        trace!(tag = %K::TAG, "native handle created");

        // On error `resource` is dropped here, which destroys the handle and
        // releases the reference taken above.
        resource.check()?;
        Ok(resource)
    }

    /// Build a handle of family `D` from this one (a copy, a frame, an
    /// iterator). When the constructor returns NULL, the reason the library
    /// left on this handle is returned instead of a bare `NullHandle`.
    pub fn derive<D, F>(&self, construct: F) -> Result<Resource<D>>
    where
        D: ResourceKind,
        F: FnOnce(&FunctionTable, *mut K::Raw) -> *mut D::Raw,
    {
        let source = self.handle()?;
        match Resource::<D>::create_with(&self.state, |table| construct(table, source)) {
            Err(WandError::NullHandle(reason)) => {
                self.check()?;
                Err(WandError::NullHandle(reason))
            }
            other => other,
        }
    }

    pub fn tag(&self) -> crate::resource::kind::ResourceTag {
        K::TAG
    }

    pub fn state(&self) -> &Arc<LibraryState> {
        &self.state
    }

    pub fn table(&self) -> &FunctionTable {
        self.state.table()
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.get().is_none()
    }

    /// The live native handle.
    pub fn handle(&self) -> Result<*mut K::Raw> {
        self.handle
            .get()
            .map(NonNull::as_ptr)
            .ok_or(WandError::DestroyedResource { tag: K::TAG })
    }

    /// Release the native handle. Calling it again is a no-op.
    pub fn destroy(&mut self) -> Result<()> {
        self.release_handle()
    }

    // The resource is marked Destroyed before the native destructor runs,
    // so a failure can leak the handle but never free it twice.
    fn release_handle(&self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        match self.state.hold() {
            Some(_live) => {
                // SAFETY: `handle` was owned by this resource and is now gone from it.
                unsafe { (K::fns(self.state.table()).destroy)(handle.as_ptr()) };
                trace!(tag = %K::TAG, "native handle destroyed");
            }
            None => {
                debug!(tag = %K::TAG, "library already torn down; leaking native handle");
            }
        }

        self.state.release()
    }

    /// Create an independent copy with its own native handle.
    pub fn try_clone(&self) -> Result<Self> {
        // SAFETY: `source` is live for the duration of the call.
        self.derive(|table, source| unsafe { (K::fns(table).clone)(source) })
    }

    // Run `f` against the live handle while teardown is held off.
    fn native<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&FunctionTable, *mut K::Raw) -> R,
    {
        let handle = self.handle()?;
        let _live = self.state.hold().ok_or(WandError::Terminated)?;
        Ok(f(self.state.table(), handle))
    }

    /// Run a native call whose result is its return value (getters, void
    /// setters), then translate whatever the exception channel says.
    pub fn with<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&FunctionTable, *mut K::Raw) -> R,
    {
        let value = self.native(f)?;
        self.check()?;
        Ok(value)
    }

    /// Run a native call that reports success as `MagickBooleanType`, then
    /// translate whatever the handle's exception channel says.
    pub fn call<F>(&mut self, operation: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&FunctionTable, *mut K::Raw) -> MagickBooleanType,
    {
        let status = self.native(f)?;
        self.check()?;
        if status == MAGICK_FALSE {
            return Err(WandError::Native(NativeException::unreported(operation)));
        }
        Ok(())
    }

    /// Read and clear the pending native exception.
    ///
    /// Warnings are logged and kept (see [`Resource::take_warnings`]);
    /// errors are returned; fatal errors also destroy the handle.
    pub fn check(&self) -> Result<()> {
        // SAFETY: the handle is live and belongs to this state's library.
        let pending = self.native(|table, handle| unsafe { take_exception::<K>(table, handle) })?;
        let Some(exception) = pending else {
            return Ok(());
        };

        match exception.severity {
            Severity::Warning => {
                warn!(tag = %K::TAG, code = exception.code, "{}", exception);
                self.warnings.borrow_mut().push(exception);
                Ok(())
            }
            Severity::Error => Err(WandError::Native(exception)),
            Severity::Fatal => {
                error!(tag = %K::TAG, code = exception.code, "{}", exception);
                if let Err(e) = self.release_handle() {
                    error!(tag = %K::TAG, error = %e, "failed to release handle after fatal error");
                }
                Err(WandError::NativeFatal(exception))
            }
        }
    }

    /// Warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<NativeException> {
        mem::take(self.warnings.get_mut())
    }
}

impl<K: ResourceKind> Drop for Resource<K> {
    fn drop(&mut self) {
        if let Err(e) = self.release_handle() {
            error!(tag = %K::TAG, error = %e, "failed to release native handle on drop");
        }
    }
}

impl<K: ResourceKind> fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("tag", &K::TAG)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
