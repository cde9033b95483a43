// Per-type constructor/destructor families.

use std::fmt;

use crate::ffi::function_table::{FunctionTable, HandleFns};
use crate::ffi::magick_wand_sys::{DrawingWand, MagickWand, PixelIterator, PixelWand};

/// Identifies which native handle family a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceTag {
    Image,
    Drawing,
    Color,
    PixelIterator,
}

impl fmt::Display for ResourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceTag::Image => "Image",
            ResourceTag::Drawing => "Drawing",
            ResourceTag::Color => "Color",
            ResourceTag::PixelIterator => "PixelIterator",
        })
    }
}

/// Static description of a handle family: its opaque native type, its tag,
/// and where its clone/destroy/exception functions live in the table.
pub trait ResourceKind {
    type Raw;
    const TAG: ResourceTag;

    fn fns(table: &FunctionTable) -> &HandleFns<Self::Raw>;
}

pub enum ImageKind {}
pub enum DrawingKind {}
pub enum ColorKind {}
pub enum IteratorKind {}

impl ResourceKind for ImageKind {
    type Raw = MagickWand;
    const TAG: ResourceTag = ResourceTag::Image;

    fn fns(table: &FunctionTable) -> &HandleFns<MagickWand> {
        &table.image.handle
    }
}

impl ResourceKind for DrawingKind {
    type Raw = DrawingWand;
    const TAG: ResourceTag = ResourceTag::Drawing;

    fn fns(table: &FunctionTable) -> &HandleFns<DrawingWand> {
        &table.drawing.handle
    }
}

impl ResourceKind for ColorKind {
    type Raw = PixelWand;
    const TAG: ResourceTag = ResourceTag::Color;

    fn fns(table: &FunctionTable) -> &HandleFns<PixelWand> {
        &table.pixel.handle
    }
}

impl ResourceKind for IteratorKind {
    type Raw = PixelIterator;
    const TAG: ResourceTag = ResourceTag::PixelIterator;

    fn fns(table: &FunctionTable) -> &HandleFns<PixelIterator> {
        &table.iterator.handle
    }
}
