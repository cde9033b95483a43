// Typed wrappers over native handles.

use std::ffi::CString;
use std::path::Path;

use crate::error::{Result, WandError};

pub mod color;
pub mod drawing;
pub mod font;
pub mod image;
pub mod pixel_iterator;
pub mod sequence;

pub use color::Color;
pub use drawing::{Drawing, Gravity};
pub use font::Font;
pub use image::Image;
pub use pixel_iterator::{PixelColor, PixelIterator};

pub(crate) fn path_to_cstring(path: &Path) -> Result<CString> {
    let text = path.to_str().ok_or_else(|| {
        WandError::invalid_argument(format!("path is not valid UTF-8: {}", path.display()))
    })?;
    Ok(CString::new(text)?)
}
