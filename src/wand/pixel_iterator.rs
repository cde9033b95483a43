// Row-by-row access to an image's pixels.

use std::marker::PhantomData;

use serde::Serialize;

use crate::error::Result;
use crate::resource::handle::Resource;
use crate::resource::kind::IteratorKind;
use crate::wand::image::Image;

/// One pixel, each channel normalized to 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl PixelColor {
    pub fn to_rgba8(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

/// Borrows the image, so the image outlives the native iterator.
#[derive(Debug)]
pub struct PixelIterator<'a> {
    resource: Resource<IteratorKind>,
    _image: PhantomData<&'a Image>,
}

impl<'a> PixelIterator<'a> {
    /// # Returns
    /// The library's reason (e.g. `ContainsNoImages`) when it cannot iterate
    /// the image.
    pub fn new(image: &'a Image) -> Result<Self> {
        let resource = image
            .resource
            .derive(|t, wand| unsafe { (t.iterator.new)(wand) })?;
        Ok(PixelIterator {
            resource,
            _image: PhantomData,
        })
    }

    /// The next row, or `None` past the last one.
    pub fn next_row(&mut self) -> Result<Option<Vec<PixelColor>>> {
        self.resource.with(|t, it| {
            let mut count: libc::size_t = 0;
            let row = unsafe { (t.iterator.next_row)(it, &mut count) };
            if row.is_null() {
                return None;
            }
            // SAFETY: the row holds `count` pixel wands owned by the
            // iterator, valid until the next iterator call.
            let colors = (0..count)
                .map(|i| unsafe {
                    let wand = *row.add(i);
                    PixelColor {
                        red: (t.pixel.get_red)(wand),
                        green: (t.pixel.get_green)(wand),
                        blue: (t.pixel.get_blue)(wand),
                        alpha: (t.pixel.get_alpha)(wand),
                    }
                })
                .collect();
            Some(colors)
        })
    }

    /// Go back to the first row.
    pub fn reset(&mut self) -> Result<()> {
        self.resource
            .with(|t, it| unsafe { (t.iterator.reset)(it) })
    }
}
