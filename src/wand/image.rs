// Image: a MagickWand holding a list of frames. Single-image operations act
// on the current frame (see `wand::sequence`).

use std::ffi::CString;
use std::path::Path;
use std::slice;
use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::error::{Result, WandError};
use crate::ffi::function_table::Capability;
use crate::ffi::magick_wand_sys::{CHAR_PIXEL, MAGICK_FALSE, MagickWand};
use crate::resource::exception::NativeException;
use crate::resource::handle::Resource;
use crate::resource::kind::ImageKind;
use crate::resource::state::LibraryState;
use crate::wand::color::Color;
use crate::wand::drawing::Drawing;
use crate::wand::path_to_cstring;
use crate::wand::pixel_iterator::PixelIterator;

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| WandError::invalid_argument(format!("{what} {value} exceeds u32::MAX")))
}

#[derive(Debug)]
pub struct Image {
    pub(crate) resource: Resource<ImageKind>,
}

impl Image {
    /// An empty wand with no image loaded.
    pub fn new(state: &Arc<LibraryState>) -> Result<Self> {
        let resource = Resource::create_with(state, |t| unsafe { (t.image.new)() })?;
        Ok(Image { resource })
    }

    /// Read an image file. The format is detected by the library.
    pub fn read(state: &Arc<LibraryState>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let c_path = path_to_cstring(path)?;
        let mut image = Image::new(state)?;
        image
            .resource
            .call("MagickReadImage", |t, w| unsafe {
                (t.image.read_image)(w, c_path.as_ptr())
            })?;
        debug!(path = %path.display(), "image read");
        Ok(image)
    }

    /// Decode an in-memory encoded image (PNG, JPEG, ...).
    pub fn from_blob(state: &Arc<LibraryState>, bytes: &[u8]) -> Result<Self> {
        let mut image = Image::new(state)?;
        image.resource.call("MagickReadImageBlob", |t, w| unsafe {
            (t.image.read_image_blob)(w, bytes.as_ptr().cast(), bytes.len())
        })?;
        Ok(image)
    }

    /// A `width` x `height` canvas filled with `background`.
    pub fn blank(
        state: &Arc<LibraryState>,
        width: usize,
        height: usize,
        background: &Color,
    ) -> Result<Self> {
        let pixel = background.raw()?;
        let mut image = Image::new(state)?;
        image.resource.call("MagickNewImage", |t, w| unsafe {
            (t.image.new_image)(w, width, height, pixel)
        })?;
        Ok(image)
    }

    /// Hand RGBA8 pixels to the library.
    pub fn from_rgba_image(state: &Arc<LibraryState>, pixels: &RgbaImage) -> Result<Self> {
        let (width, height) = (pixels.width() as usize, pixels.height() as usize);
        let mut image = Image::new(state)?;
        image.resource.call("MagickConstituteImage", |t, w| unsafe {
            (t.image.constitute_image)(
                w,
                width,
                height,
                c"RGBA".as_ptr(),
                CHAR_PIXEL,
                pixels.as_raw().as_ptr().cast(),
            )
        })?;
        Ok(image)
    }

    pub fn state(&self) -> &Arc<LibraryState> {
        self.resource.state()
    }

    pub(crate) fn raw(&self) -> Result<*mut MagickWand> {
        self.resource.handle()
    }

    pub fn width(&self) -> Result<usize> {
        self.resource
            .with(|t, w| unsafe { (t.image.get_image_width)(w) })
    }

    pub fn height(&self) -> Result<usize> {
        self.resource
            .with(|t, w| unsafe { (t.image.get_image_height)(w) })
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> Result<(usize, usize)> {
        Ok((self.width()?, self.height()?))
    }

    /// Format name as the library spells it (`"PNG"`, `"JPEG"`, ...).
    pub fn format(&self) -> Result<String> {
        let format = self
            .resource
            .with(|t, w| unsafe { t.core.take_string((t.image.get_image_format)(w)) })?;
        format.ok_or_else(|| WandError::null_handle("MagickGetImageFormat returned NULL"))
    }

    /// Format used by `to_blob` and by `write` when the path has no
    /// recognised extension.
    pub fn set_format(&mut self, format: &str) -> Result<()> {
        let c_format = CString::new(format)?;
        self.resource.call("MagickSetImageFormat", |t, w| unsafe {
            (t.image.set_image_format)(w, c_format.as_ptr())
        })
    }

    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let c_path = path_to_cstring(path)?;
        self.resource.call("MagickWriteImage", |t, w| unsafe {
            (t.image.write_image)(w, c_path.as_ptr())
        })?;
        debug!(path = %path.display(), "image written");
        Ok(())
    }

    /// Encode in the current format.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let mut length: libc::size_t = 0;
        let bytes = self.resource.with(|t, w| unsafe {
            let blob = (t.image.get_image_blob)(w, &mut length);
            if blob.is_null() {
                return None;
            }
            let bytes = slice::from_raw_parts(blob, length).to_vec();
            (t.core.relinquish_memory)(blob.cast());
            Some(bytes)
        })?;
        bytes.ok_or_else(|| WandError::Native(NativeException::unreported("MagickGetImageBlob")))
    }

    /// Resize to exactly `width` x `height`.
    pub fn scale(&mut self, width: usize, height: usize) -> Result<()> {
        self.resource.call("MagickScaleImage", |t, w| unsafe {
            (t.image.scale_image)(w, width, height)
        })
    }

    /// Render the primitives recorded in `drawing`.
    pub fn draw(&mut self, drawing: &Drawing) -> Result<()> {
        let d = drawing.raw()?;
        self.resource
            .call("MagickDrawImage", |t, w| unsafe { (t.image.draw_image)(w, d) })
    }

    /// Rotate/flip according to the EXIF orientation.
    ///
    /// # Returns
    /// `Err(WandError::Unsupported)` if the loaded library does not export
    /// `MagickAutoOrientImage`.
    pub fn auto_orient(&mut self) -> Result<()> {
        let auto_orient = self
            .resource
            .table()
            .optional
            .auto_orient_image
            .ok_or(WandError::Unsupported(Capability::AutoOrient.symbol()))?;
        self.resource
            .call("MagickAutoOrientImage", |_, w| unsafe { auto_orient(w) })
    }

    /// Copy the pixels out as RGBA8.
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let (width, height) = self.size()?;
        let (w32, h32) = (to_u32(width, "width")?, to_u32(height, "height")?);
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                WandError::invalid_argument(format!("{width}x{height} RGBA buffer overflows"))
            })?;
        let mut buffer = vec![0u8; len];
        let status = self.resource.with(|t, w| unsafe {
            (t.image.export_image_pixels)(
                w,
                0,
                0,
                width,
                height,
                c"RGBA".as_ptr(),
                CHAR_PIXEL,
                buffer.as_mut_ptr().cast(),
            )
        })?;
        if status == MAGICK_FALSE {
            return Err(WandError::Native(NativeException::unreported(
                "MagickExportImagePixels",
            )));
        }
        RgbaImage::from_raw(w32, h32, buffer).ok_or_else(|| {
            WandError::invalid_argument(format!("pixel buffer does not match {width}x{height}"))
        })
    }

    /// Iterate over rows of pixels.
    pub fn pixel_iterator(&self) -> Result<PixelIterator<'_>> {
        PixelIterator::new(self)
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Image {
            resource: self.resource.try_clone()?,
        })
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.resource.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.resource.is_destroyed()
    }

    /// Warnings reported by the library since the last call.
    pub fn take_warnings(&mut self) -> Vec<NativeException> {
        self.resource.take_warnings()
    }
}
