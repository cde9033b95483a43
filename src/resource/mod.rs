// Resource lifecycle: the shared library state and the handles that keep it
// alive.

pub mod exception;
pub mod handle;
pub mod kind;
pub mod limits;
pub mod state;

pub use handle::Resource;
pub use kind::ResourceTag;
pub use state::{LibraryGuard, LibraryState, initialize, library};
