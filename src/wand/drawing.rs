// Drawing: a DrawingWand that records vector primitives and text for
// `Image::draw`.

use std::ffi::CString;
use std::sync::Arc;

use crate::error::{Result, WandError};
use crate::ffi::function_table::FunctionTable;
use crate::ffi::magick_wand_sys::{DrawingWand, GravityType, MAGICK_FALSE, MAGICK_TRUE};
use crate::resource::handle::Resource;
use crate::resource::kind::DrawingKind;
use crate::resource::state::LibraryState;
use crate::wand::color::Color;
use crate::wand::font::Font;
use crate::wand::path_to_cstring;

/// Where text is placed relative to the point passed to [`Drawing::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Gravity {
    const ALL: [Gravity; 9] = [
        Gravity::NorthWest,
        Gravity::North,
        Gravity::NorthEast,
        Gravity::West,
        Gravity::Center,
        Gravity::East,
        Gravity::SouthWest,
        Gravity::South,
        Gravity::SouthEast,
    ];

    fn to_native(self) -> GravityType {
        self as GravityType + 1
    }

    /// `None` for `UndefinedGravity` and unknown values.
    fn from_native(value: GravityType) -> Option<Self> {
        let index = usize::try_from(value).ok()?.checked_sub(1)?;
        Self::ALL.get(index).copied()
    }
}

fn check_non_negative(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(WandError::invalid_argument(format!(
            "{what} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub struct Drawing {
    resource: Resource<DrawingKind>,
}

impl Drawing {
    pub fn new(state: &Arc<LibraryState>) -> Result<Self> {
        let resource = Resource::create_with(state, |t| unsafe { (t.drawing.new)() })?;
        Ok(Drawing { resource })
    }

    // DrawingWand setters return void; failures only show up on the
    // exception channel.
    fn apply<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&FunctionTable, *mut DrawingWand),
    {
        self.resource.with(f)
    }

    pub fn set_fill_color(&mut self, color: &Color) -> Result<()> {
        let pixel = color.raw()?;
        self.apply(|t, d| unsafe { (t.drawing.set_fill_color)(d, pixel) })
    }

    pub fn set_stroke_color(&mut self, color: &Color) -> Result<()> {
        let pixel = color.raw()?;
        self.apply(|t, d| unsafe { (t.drawing.set_stroke_color)(d, pixel) })
    }

    pub fn set_stroke_width(&mut self, width: f64) -> Result<()> {
        check_non_negative("stroke width", width)?;
        self.apply(|t, d| unsafe { (t.drawing.set_stroke_width)(d, width) })
    }

    pub fn stroke_width(&self) -> Result<f64> {
        self.resource
            .with(|t, d| unsafe { (t.drawing.get_stroke_width)(d) })
    }

    /// Filled rectangle between two corners, using the current fill colour.
    pub fn rectangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        self.apply(|t, d| unsafe { (t.drawing.rectangle)(d, x1, y1, x2, y2) })
    }

    /// Line segment, using the current stroke colour and width.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        self.apply(|t, d| unsafe { (t.drawing.line)(d, x1, y1, x2, y2) })
    }

    /// Font file or family name used by [`Drawing::text`].
    pub fn set_font_name(&mut self, name: &str) -> Result<()> {
        let c_name = CString::new(name)?;
        self.resource.call("DrawSetFont", |t, d| unsafe {
            (t.drawing.set_font)(d, c_name.as_ptr())
        })
    }

    /// `None` until a font is set.
    pub fn font_name(&self) -> Result<Option<String>> {
        self.resource
            .with(|t, d| unsafe { t.core.take_string((t.drawing.get_font)(d)) })
    }

    /// Apply every setting `font` carries: the file, then size, colour and
    /// antialiasing when given.
    pub fn set_font(&mut self, font: &Font) -> Result<()> {
        let c_path = path_to_cstring(font.path())?;
        self.resource.call("DrawSetFont", |t, d| unsafe {
            (t.drawing.set_font)(d, c_path.as_ptr())
        })?;
        if let Some(size) = font.size_setting() {
            self.set_font_size(size)?;
        }
        if let Some(spec) = font.color_setting() {
            let color = Color::new(self.resource.state(), spec)?;
            self.set_fill_color(&color)?;
        }
        if let Some(antialias) = font.antialias_setting() {
            self.set_text_antialias(antialias)?;
        }
        Ok(())
    }

    /// Point size.
    pub fn set_font_size(&mut self, size: f64) -> Result<()> {
        check_non_negative("font size", size)?;
        self.apply(|t, d| unsafe { (t.drawing.set_font_size)(d, size) })
    }

    pub fn font_size(&self) -> Result<f64> {
        self.resource
            .with(|t, d| unsafe { (t.drawing.get_font_size)(d) })
    }

    pub fn set_gravity(&mut self, gravity: Gravity) -> Result<()> {
        self.apply(|t, d| unsafe { (t.drawing.set_gravity)(d, gravity.to_native()) })
    }

    /// `None` until a gravity is set.
    pub fn gravity(&self) -> Result<Option<Gravity>> {
        let value = self
            .resource
            .with(|t, d| unsafe { (t.drawing.get_gravity)(d) })?;
        Ok(Gravity::from_native(value))
    }

    pub fn set_text_antialias(&mut self, antialias: bool) -> Result<()> {
        let value = if antialias { MAGICK_TRUE } else { MAGICK_FALSE };
        self.apply(|t, d| unsafe { (t.drawing.set_text_antialias)(d, value) })
    }

    pub fn text_antialias(&self) -> Result<bool> {
        let value = self
            .resource
            .with(|t, d| unsafe { (t.drawing.get_text_antialias)(d) })?;
        Ok(value != MAGICK_FALSE)
    }

    /// Text with its baseline starting at (`x`, `y`), in the current font,
    /// size and fill colour.
    pub fn text(&mut self, x: f64, y: f64, body: &str) -> Result<()> {
        check_non_negative("x", x)?;
        check_non_negative("y", y)?;
        if body.is_empty() {
            return Err(WandError::invalid_argument("text body cannot be empty"));
        }
        let c_body = CString::new(body)?;
        self.apply(|t, d| unsafe { (t.drawing.annotation)(d, x, y, c_body.as_ptr().cast()) })
    }

    pub(crate) fn raw(&self) -> Result<*mut DrawingWand> {
        self.resource.handle()
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Drawing {
            resource: self.resource.try_clone()?,
        })
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.resource.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.resource.is_destroyed()
    }
}
