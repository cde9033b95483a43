// Frame list operations on `Image`. A wand holds zero or more frames and a
// current index; extracted frames are independent wands.

use crate::error::{Result, WandError};
use crate::resource::exception::NativeException;
use crate::wand::image::Image;

impl Image {
    /// Number of frames in the wand. Zero for a new wand.
    pub fn frame_count(&self) -> Result<usize> {
        self.resource
            .with(|t, w| unsafe { (t.image.get_number_images)(w) })
    }

    /// Index of the frame single-image operations act on.
    pub fn current_frame(&self) -> Result<usize> {
        let index = self
            .resource
            .with(|t, w| unsafe { (t.image.get_iterator_index)(w) })?;
        usize::try_from(index)
            .map_err(|_| WandError::Native(NativeException::unreported("MagickGetIteratorIndex")))
    }

    /// Make frame `index` the current one.
    pub fn set_current_frame(&mut self, index: usize) -> Result<()> {
        let total = self.frame_count()?;
        if index >= total {
            return Err(WandError::invalid_argument(format!(
                "frame index {index} out of range (total: {total})"
            )));
        }
        let native = isize::try_from(index)
            .map_err(|_| WandError::invalid_argument(format!("frame index {index} too large")))?;
        self.resource.call("MagickSetIteratorIndex", |t, w| unsafe {
            (t.image.set_iterator_index)(w, native)
        })
    }

    /// Copy frame `index` into a wand of its own.
    ///
    /// # Returns
    /// A new `Image` with one reference of its own. The current frame of
    /// `self` is left where it was.
    pub fn frame(&mut self, index: usize) -> Result<Image> {
        let previous = self.current_frame()?;
        self.set_current_frame(index)?;
        let extracted = self
            .resource
            .derive(|t, w| unsafe { (t.image.get_image)(w) });
        self.set_current_frame(previous)?;
        Ok(Image {
            resource: extracted?,
        })
    }

    /// Every frame, in order, each in a wand of its own.
    pub fn frames(&mut self) -> Result<Vec<Image>> {
        let total = self.frame_count()?;
        (0..total).map(|index| self.frame(index)).collect()
    }

    /// Append copies of all of `other`'s frames after the last frame.
    ///
    /// The last appended frame becomes current.
    pub fn push_frames(&mut self, other: &Image) -> Result<()> {
        let total = self.frame_count()?;
        if total > 0 {
            self.set_current_frame(total - 1)?;
        }
        let source = other.resource.handle()?;
        self.resource.call("MagickAddImage", |t, w| unsafe {
            (t.image.add_image)(w, source)
        })
    }

    /// Drop frame `index`. The frame after it becomes current, or the new
    /// last frame when `index` was the last.
    pub fn remove_frame(&mut self, index: usize) -> Result<()> {
        self.set_current_frame(index)?;
        self.resource
            .call("MagickRemoveImage", |t, w| unsafe { (t.image.remove_image)(w) })
    }
}
