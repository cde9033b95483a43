//! Run-time binding to ImageMagick's MagickWand C API.
//!
//! The shared library is located and opened on first use (see
//! [`library`]). Every wrapped object holds one reference on the process-wide
//! [`LibraryState`]; `MagickWandGenesis` runs before the first object is
//! created and `MagickWandTerminus` runs once, at process exit.

pub mod config;
pub mod error;
pub mod ffi;
pub mod loader;
pub mod resource;
pub mod version;
pub mod wand;

pub use error::{LoadError, Result, WandError};
pub use resource::{LibraryState, initialize, library};
pub use version::{MagickVersion, VersionReport};
pub use wand::{Color, Drawing, Font, Gravity, Image, PixelColor, PixelIterator};
