// Bound MagickWand function table: one typed pointer per exported symbol,
// grouped by handle family, with optional symbols kept as `Option`.

use std::ffi::CStr;
use std::fmt;

use libc::{c_char, c_void};

use super::magick_wand_sys::*;
use crate::error::LoadError;
use crate::loader::LoadedLibrary;

/// Global lifecycle, version and memory functions.
pub struct CoreFns {
    pub genesis: GenesisFn,
    pub terminus: TerminusFn,
    pub get_version: GetVersionFn,
    pub get_release_date: GetReleaseDateFn,
    pub get_quantum_depth: GetQuantumFn,
    pub get_quantum_range: GetQuantumFn,
    pub query_configure_option: QueryConfigureOptionFn,
    pub query_formats: QueryFormatsFn,
    pub relinquish_memory: RelinquishMemoryFn,
    pub get_resource: GetResourceFn,
    pub get_resource_limit: GetResourceFn,
    pub set_resource_limit: SetResourceLimitFn,
}

impl CoreFns {
    /// Copy a library-owned string and hand the buffer back with
    /// `MagickRelinquishMemory`. Returns `None` for NULL.
    ///
    /// # Safety
    /// `ptr` must be NULL or a NUL-terminated buffer allocated by the library.
    pub unsafe fn take_string(&self, ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let value = unsafe { CStr::from_ptr(ptr) }
            .to_string_lossy()
            .into_owned();
        unsafe { (self.relinquish_memory)(ptr as *mut c_void) };
        Some(value)
    }
}

/// Copy a string the library keeps ownership of (static version strings).
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn borrowed_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

/// Clone/destroy/validate/exception functions shared by every handle family.
pub struct HandleFns<T> {
    pub clone: CloneFn<T>,
    pub destroy: DestroyFn<T>,
    pub is_valid: IsFn<T>,
    pub get_exception: GetExceptionFn<T>,
    pub clear_exception: ClearExceptionFn<T>,
}

pub struct ImageFns {
    pub new: NewFn<MagickWand>,
    pub handle: HandleFns<MagickWand>,
    pub read_image: ReadImageFn,
    pub read_image_blob: ReadImageBlobFn,
    pub write_image: WriteImageFn,
    pub get_image_blob: GetImageBlobFn,
    pub get_image_width: GetImageSizeFn,
    pub get_image_height: GetImageSizeFn,
    pub get_image_format: GetImageFormatFn,
    pub set_image_format: SetImageFormatFn,
    pub new_image: NewImageFn,
    pub scale_image: ScaleImageFn,
    pub export_image_pixels: ExportImagePixelsFn,
    pub constitute_image: ConstituteImageFn,
    pub draw_image: DrawImageFn,
    pub get_number_images: GetNumberImagesFn,
    pub get_iterator_index: GetIteratorIndexFn,
    pub set_iterator_index: SetIteratorIndexFn,
    pub get_image: GetImageFn,
    pub add_image: AddImageFn,
    pub remove_image: RemoveImageFn,
}

pub struct DrawingFns {
    pub new: NewFn<DrawingWand>,
    pub handle: HandleFns<DrawingWand>,
    pub set_fill_color: DrawSetColorFn,
    pub set_stroke_color: DrawSetColorFn,
    pub set_stroke_width: DrawSetDoubleFn,
    pub get_stroke_width: DrawGetDoubleFn,
    pub rectangle: DrawShapeFn,
    pub line: DrawShapeFn,
    pub set_font: DrawSetFontFn,
    pub get_font: DrawGetStringFn,
    pub set_font_size: DrawSetDoubleFn,
    pub get_font_size: DrawGetDoubleFn,
    pub set_gravity: DrawSetGravityFn,
    pub get_gravity: DrawGetGravityFn,
    pub set_text_antialias: DrawSetBooleanFn,
    pub get_text_antialias: DrawGetBooleanFn,
    pub annotation: DrawAnnotationFn,
}

pub struct PixelFns {
    pub new: NewFn<PixelWand>,
    pub handle: HandleFns<PixelWand>,
    pub set_color: PixelSetColorFn,
    pub get_color_as_string: PixelGetStringFn,
    pub get_red: PixelGetChannelFn,
    pub get_green: PixelGetChannelFn,
    pub get_blue: PixelGetChannelFn,
    pub get_alpha: PixelGetChannelFn,
    pub is_similar: PixelSimilarFn,
}

pub struct IteratorFns {
    pub new: NewPixelIteratorFn,
    pub handle: HandleFns<PixelIterator>,
    pub reset: ResetIteratorFn,
    pub next_row: NextIteratorRowFn,
}

/// Symbols that only newer library revisions export.
#[derive(Default)]
pub struct OptionalFns {
    pub is_instantiated: Option<IsInstantiatedFn>,
    pub set_seed: Option<SetSeedFn>,
    pub auto_orient_image: Option<AutoOrientImageFn>,
}

/// A feature backed by an optional symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    InstantiationQuery,
    RandomSeed,
    AutoOrient,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::InstantiationQuery,
        Capability::RandomSeed,
        Capability::AutoOrient,
    ];

    /// Native symbol name backing this capability.
    pub fn symbol(self) -> &'static str {
        match self {
            Capability::InstantiationQuery => "IsMagickWandInstantiated",
            Capability::RandomSeed => "MagickSetSeed",
            Capability::AutoOrient => "MagickAutoOrientImage",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Every function this crate calls, resolved once per loaded library.
pub struct FunctionTable {
    pub core: CoreFns,
    pub image: ImageFns,
    pub drawing: DrawingFns,
    pub pixel: PixelFns,
    pub iterator: IteratorFns,
    pub optional: OptionalFns,
}

impl FunctionTable {
    /// Resolve every symbol from `library`.
    ///
    /// A missing required symbol is an error naming the symbol; a missing
    /// optional symbol only disables its [`Capability`].
    pub fn bind(library: &LoadedLibrary) -> Result<Self, LoadError> {
        let table = FunctionTable {
            core: CoreFns {
                genesis: library.required("MagickWandGenesis")?,
                terminus: library.required("MagickWandTerminus")?,
                get_version: library.required("MagickGetVersion")?,
                get_release_date: library.required("MagickGetReleaseDate")?,
                get_quantum_depth: library.required("MagickGetQuantumDepth")?,
                get_quantum_range: library.required("MagickGetQuantumRange")?,
                query_configure_option: library.required("MagickQueryConfigureOption")?,
                query_formats: library.required("MagickQueryFormats")?,
                relinquish_memory: library.required("MagickRelinquishMemory")?,
                get_resource: library.required("MagickGetResource")?,
                get_resource_limit: library.required("MagickGetResourceLimit")?,
                set_resource_limit: library.required("MagickSetResourceLimit")?,
            },
            image: ImageFns {
                new: library.required("NewMagickWand")?,
                handle: HandleFns {
                    clone: library.required("CloneMagickWand")?,
                    destroy: library.required("DestroyMagickWand")?,
                    is_valid: library.required("IsMagickWand")?,
                    get_exception: library.required("MagickGetException")?,
                    clear_exception: library.required("MagickClearException")?,
                },
                read_image: library.required("MagickReadImage")?,
                read_image_blob: library.required("MagickReadImageBlob")?,
                write_image: library.required("MagickWriteImage")?,
                get_image_blob: library.required("MagickGetImageBlob")?,
                get_image_width: library.required("MagickGetImageWidth")?,
                get_image_height: library.required("MagickGetImageHeight")?,
                get_image_format: library.required("MagickGetImageFormat")?,
                set_image_format: library.required("MagickSetImageFormat")?,
                new_image: library.required("MagickNewImage")?,
                scale_image: library.required("MagickScaleImage")?,
                export_image_pixels: library.required("MagickExportImagePixels")?,
                constitute_image: library.required("MagickConstituteImage")?,
                draw_image: library.required("MagickDrawImage")?,
                get_number_images: library.required("MagickGetNumberImages")?,
                get_iterator_index: library.required("MagickGetIteratorIndex")?,
                set_iterator_index: library.required("MagickSetIteratorIndex")?,
                get_image: library.required("MagickGetImage")?,
                add_image: library.required("MagickAddImage")?,
                remove_image: library.required("MagickRemoveImage")?,
            },
            drawing: DrawingFns {
                new: library.required("NewDrawingWand")?,
                handle: HandleFns {
                    clone: library.required("CloneDrawingWand")?,
                    destroy: library.required("DestroyDrawingWand")?,
                    is_valid: library.required("IsDrawingWand")?,
                    get_exception: library.required("DrawGetException")?,
                    clear_exception: library.required("DrawClearException")?,
                },
                set_fill_color: library.required("DrawSetFillColor")?,
                set_stroke_color: library.required("DrawSetStrokeColor")?,
                set_stroke_width: library.required("DrawSetStrokeWidth")?,
                get_stroke_width: library.required("DrawGetStrokeWidth")?,
                rectangle: library.required("DrawRectangle")?,
                line: library.required("DrawLine")?,
                set_font: library.required("DrawSetFont")?,
                get_font: library.required("DrawGetFont")?,
                set_font_size: library.required("DrawSetFontSize")?,
                get_font_size: library.required("DrawGetFontSize")?,
                set_gravity: library.required("DrawSetGravity")?,
                get_gravity: library.required("DrawGetGravity")?,
                set_text_antialias: library.required("DrawSetTextAntialias")?,
                get_text_antialias: library.required("DrawGetTextAntialias")?,
                annotation: library.required("DrawAnnotation")?,
            },
            pixel: PixelFns {
                new: library.required("NewPixelWand")?,
                handle: HandleFns {
                    clone: library.required("ClonePixelWand")?,
                    destroy: library.required("DestroyPixelWand")?,
                    is_valid: library.required("IsPixelWand")?,
                    get_exception: library.required("PixelGetException")?,
                    clear_exception: library.required("PixelClearException")?,
                },
                set_color: library.required("PixelSetColor")?,
                get_color_as_string: library.required("PixelGetColorAsString")?,
                get_red: library.required("PixelGetRed")?,
                get_green: library.required("PixelGetGreen")?,
                get_blue: library.required("PixelGetBlue")?,
                get_alpha: library.required("PixelGetAlpha")?,
                is_similar: library.required("IsPixelWandSimilar")?,
            },
            iterator: IteratorFns {
                new: library.required("NewPixelIterator")?,
                handle: HandleFns {
                    clone: library.required("ClonePixelIterator")?,
                    destroy: library.required("DestroyPixelIterator")?,
                    is_valid: library.required("IsPixelIterator")?,
                    get_exception: library.required("PixelGetIteratorException")?,
                    clear_exception: library.required("PixelClearIteratorException")?,
                },
                reset: library.required("PixelResetIterator")?,
                next_row: library.required("PixelGetNextIteratorRow")?,
            },
            optional: OptionalFns {
                is_instantiated: library.optional("IsMagickWandInstantiated"),
                set_seed: library.optional("MagickSetSeed"),
                auto_orient_image: library.optional("MagickAutoOrientImage"),
            },
        };

        for capability in Capability::ALL {
            if !table.supports(capability) {
                tracing::debug!(
                    library = library.path(),
                    symbol = capability.symbol(),
                    "optional MagickWand symbol not exported; capability disabled"
                );
            }
        }

        Ok(table)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::InstantiationQuery => self.optional.is_instantiated.is_some(),
            Capability::RandomSeed => self.optional.set_seed.is_some(),
            Capability::AutoOrient => self.optional.auto_orient_image.is_some(),
        }
    }

    /// Capabilities the loaded library provides.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }
}
