// Color: a single PixelWand.

use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, WandError};
use crate::ffi::function_table::PixelFns;
use crate::ffi::magick_wand_sys::{MAGICK_FALSE, PixelGetChannelFn, PixelWand};
use crate::resource::handle::Resource;
use crate::resource::kind::ColorKind;
use crate::resource::state::LibraryState;

/// A colour held by the native library, parsed from any spec it accepts
/// (`"red"`, `"#ff000080"`, `"srgb(255,0,0)"`, ...).
#[derive(Debug)]
pub struct Color {
    resource: Resource<ColorKind>,
    spec: String,
}

impl Color {
    /// Parse `spec` with `PixelSetColor`.
    ///
    /// # Returns
    /// `Err(WandError::Native)` if the library does not recognise the spec;
    /// the half-built handle is released before returning.
    pub fn new(state: &Arc<LibraryState>, spec: &str) -> Result<Self> {
        let c_spec = CString::new(spec)?;
        let mut resource =
            Resource::<ColorKind>::create_with(state, |t| unsafe { (t.pixel.new)() })?;
        resource.call("PixelSetColor", |t, p| unsafe {
            (t.pixel.set_color)(p, c_spec.as_ptr())
        })?;
        Ok(Color {
            resource,
            spec: spec.to_string(),
        })
    }

    /// The spec this colour was created from.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    fn channel(&self, pick: fn(&PixelFns) -> PixelGetChannelFn) -> Result<f64> {
        self.resource
            .with(|t, p| unsafe { pick(&t.pixel)(p) })
    }

    pub fn red(&self) -> Result<f64> {
        self.channel(|f| f.get_red)
    }

    pub fn green(&self) -> Result<f64> {
        self.channel(|f| f.get_green)
    }

    pub fn blue(&self) -> Result<f64> {
        self.channel(|f| f.get_blue)
    }

    pub fn alpha(&self) -> Result<f64> {
        self.channel(|f| f.get_alpha)
    }

    /// The library's canonical spelling, e.g. `srgb(255,0,0)`.
    pub fn to_native_string(&self) -> Result<String> {
        self.resource
            .with(|t, p| unsafe { t.core.take_string((t.pixel.get_color_as_string)(p)) })?
            .ok_or_else(|| WandError::null_handle("PixelGetColorAsString returned NULL"))
    }

    /// Whether `other` is within `fuzz` of this colour. `fuzz` is a fraction
    /// of the quantum range (0.0 = identical, 1.0 = one full channel apart).
    pub fn is_similar(&self, other: &Color, fuzz: f64) -> Result<bool> {
        if !(0.0..=1.0).contains(&fuzz) {
            return Err(WandError::invalid_argument(format!(
                "fuzz must be within 0.0..=1.0, got {fuzz}"
            )));
        }
        let theirs = other.raw()?;
        self.resource.with(|t, ours| {
            let mut range: libc::size_t = 0;
            unsafe {
                (t.core.get_quantum_range)(&mut range);
                (t.pixel.is_similar)(ours, theirs, fuzz * range as f64) != MAGICK_FALSE
            }
        })
    }

    pub(crate) fn raw(&self) -> Result<*mut PixelWand> {
        self.resource.handle()
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Color {
            resource: self.resource.try_clone()?,
            spec: self.spec.clone(),
        })
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.resource.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.resource.is_destroyed()
    }
}

/// Same colour and same opacity, as the library sees them (`"red"` equals
/// `"#ff0000"`). A destroyed colour equals nothing.
impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_similar(other, 0.0), self.alpha(), other.alpha()) {
            (Ok(similar), Ok(ours), Ok(theirs)) => similar && ours == theirs,
            _ => false,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec)
    }
}
