// Hand-written FFI declarations for the MagickWand C API.
// The shared library is opened at run time, so every export is described as a
// function-pointer type rather than an `extern` block. Only the subset this
// crate binds is declared. Signatures are the ones shared by ImageMagick 6
// and 7; symbols whose arguments differ between the two are not bound.

use libc::{c_char, c_double, c_int, c_uchar, c_uint, c_ulong, c_void, size_t, ssize_t};

/// Opaque `MagickWand` (an image list plus its exception state).
#[repr(C)]
pub struct MagickWand {
    _opaque: [u8; 0],
}

/// Opaque `DrawingWand`.
#[repr(C)]
pub struct DrawingWand {
    _opaque: [u8; 0],
}

/// Opaque `PixelWand` (a single colour).
#[repr(C)]
pub struct PixelWand {
    _opaque: [u8; 0],
}

/// Opaque `PixelIterator`.
#[repr(C)]
pub struct PixelIterator {
    _opaque: [u8; 0],
}

pub type MagickBooleanType = c_uint;
pub const MAGICK_FALSE: MagickBooleanType = 0;
pub const MAGICK_TRUE: MagickBooleanType = 1;

/// `ExceptionType` severity/domain code.
pub type ExceptionType = c_int;
pub const UNDEFINED_EXCEPTION: ExceptionType = 0;
pub const WARNING_EXCEPTION: ExceptionType = 300;
pub const ERROR_EXCEPTION: ExceptionType = 400;
pub const FATAL_ERROR_EXCEPTION: ExceptionType = 700;

/// `StorageType`. `CharPixel` has the same value in 6 and 7.
pub type StorageType = c_int;
pub const CHAR_PIXEL: StorageType = 1;

/// `ResourceType`. Ordinals differ between 6 and 7, see `resource::limits`.
pub type ResourceType = c_int;

/// `GravityType`. `UndefinedGravity` is 0, then NorthWest (1) through
/// SouthEast (9) in reading order; identical in 6 and 7.
pub type GravityType = c_int;

/// `MagickSizeType` is `unsigned long long` on every supported platform.
pub type MagickSizeType = u64;

// --- Global lifecycle / version ---

pub type GenesisFn = unsafe extern "C" fn();
pub type TerminusFn = unsafe extern "C" fn();
pub type IsInstantiatedFn = unsafe extern "C" fn() -> MagickBooleanType;
pub type GetVersionFn = unsafe extern "C" fn(version: *mut size_t) -> *const c_char;
pub type GetReleaseDateFn = unsafe extern "C" fn() -> *const c_char;
pub type GetQuantumFn = unsafe extern "C" fn(value: *mut size_t) -> *const c_char;
pub type QueryConfigureOptionFn = unsafe extern "C" fn(option: *const c_char) -> *mut c_char;
pub type QueryFormatsFn =
    unsafe extern "C" fn(pattern: *const c_char, number: *mut size_t) -> *mut *mut c_char;
pub type RelinquishMemoryFn = unsafe extern "C" fn(memory: *mut c_void) -> *mut c_void;
pub type SetSeedFn = unsafe extern "C" fn(seed: c_ulong);

// --- Resource limits ---

pub type GetResourceFn = unsafe extern "C" fn(kind: ResourceType) -> MagickSizeType;
pub type SetResourceLimitFn =
    unsafe extern "C" fn(kind: ResourceType, limit: MagickSizeType) -> MagickBooleanType;

// --- Per-family lifecycle, generic over the opaque type ---

pub type NewFn<T> = unsafe extern "C" fn() -> *mut T;
pub type CloneFn<T> = unsafe extern "C" fn(wand: *const T) -> *mut T;
pub type DestroyFn<T> = unsafe extern "C" fn(wand: *mut T) -> *mut T;
pub type IsFn<T> = unsafe extern "C" fn(wand: *const T) -> MagickBooleanType;
pub type GetExceptionFn<T> =
    unsafe extern "C" fn(wand: *const T, severity: *mut ExceptionType) -> *mut c_char;
pub type ClearExceptionFn<T> = unsafe extern "C" fn(wand: *mut T) -> MagickBooleanType;

// --- MagickWand (image) operations ---

pub type ReadImageFn =
    unsafe extern "C" fn(wand: *mut MagickWand, filename: *const c_char) -> MagickBooleanType;
pub type ReadImageBlobFn = unsafe extern "C" fn(
    wand: *mut MagickWand,
    blob: *const c_void,
    length: size_t,
) -> MagickBooleanType;
pub type WriteImageFn =
    unsafe extern "C" fn(wand: *mut MagickWand, filename: *const c_char) -> MagickBooleanType;
pub type GetImageBlobFn =
    unsafe extern "C" fn(wand: *mut MagickWand, length: *mut size_t) -> *mut u8;
pub type GetImageSizeFn = unsafe extern "C" fn(wand: *mut MagickWand) -> size_t;
pub type GetImageFormatFn = unsafe extern "C" fn(wand: *mut MagickWand) -> *mut c_char;
pub type SetImageFormatFn =
    unsafe extern "C" fn(wand: *mut MagickWand, format: *const c_char) -> MagickBooleanType;
pub type NewImageFn = unsafe extern "C" fn(
    wand: *mut MagickWand,
    columns: size_t,
    rows: size_t,
    background: *const PixelWand,
) -> MagickBooleanType;
pub type ScaleImageFn =
    unsafe extern "C" fn(wand: *mut MagickWand, columns: size_t, rows: size_t) -> MagickBooleanType;
pub type ExportImagePixelsFn = unsafe extern "C" fn(
    wand: *mut MagickWand,
    x: ssize_t,
    y: ssize_t,
    columns: size_t,
    rows: size_t,
    map: *const c_char,
    storage: StorageType,
    pixels: *mut c_void,
) -> MagickBooleanType;
pub type ConstituteImageFn = unsafe extern "C" fn(
    wand: *mut MagickWand,
    columns: size_t,
    rows: size_t,
    map: *const c_char,
    storage: StorageType,
    pixels: *const c_void,
) -> MagickBooleanType;
pub type DrawImageFn =
    unsafe extern "C" fn(wand: *mut MagickWand, drawing: *const DrawingWand) -> MagickBooleanType;
pub type AutoOrientImageFn = unsafe extern "C" fn(wand: *mut MagickWand) -> MagickBooleanType;

// --- MagickWand image list ---

pub type GetNumberImagesFn = unsafe extern "C" fn(wand: *mut MagickWand) -> size_t;
pub type GetIteratorIndexFn = unsafe extern "C" fn(wand: *mut MagickWand) -> ssize_t;
pub type SetIteratorIndexFn =
    unsafe extern "C" fn(wand: *mut MagickWand, index: ssize_t) -> MagickBooleanType;
pub type GetImageFn = unsafe extern "C" fn(wand: *mut MagickWand) -> *mut MagickWand;
pub type AddImageFn =
    unsafe extern "C" fn(wand: *mut MagickWand, add_wand: *const MagickWand) -> MagickBooleanType;
pub type RemoveImageFn = unsafe extern "C" fn(wand: *mut MagickWand) -> MagickBooleanType;

// --- DrawingWand operations ---

pub type DrawSetColorFn = unsafe extern "C" fn(drawing: *mut DrawingWand, color: *const PixelWand);
pub type DrawSetDoubleFn = unsafe extern "C" fn(drawing: *mut DrawingWand, value: c_double);
pub type DrawGetDoubleFn = unsafe extern "C" fn(drawing: *const DrawingWand) -> c_double;
pub type DrawSetFontFn =
    unsafe extern "C" fn(drawing: *mut DrawingWand, font_name: *const c_char) -> MagickBooleanType;
pub type DrawGetStringFn = unsafe extern "C" fn(drawing: *const DrawingWand) -> *mut c_char;
pub type DrawSetGravityFn = unsafe extern "C" fn(drawing: *mut DrawingWand, gravity: GravityType);
pub type DrawGetGravityFn = unsafe extern "C" fn(drawing: *const DrawingWand) -> GravityType;
pub type DrawSetBooleanFn =
    unsafe extern "C" fn(drawing: *mut DrawingWand, value: MagickBooleanType);
pub type DrawGetBooleanFn = unsafe extern "C" fn(drawing: *const DrawingWand) -> MagickBooleanType;
pub type DrawAnnotationFn = unsafe extern "C" fn(
    drawing: *mut DrawingWand,
    x: c_double,
    y: c_double,
    text: *const c_uchar,
);
pub type DrawShapeFn = unsafe extern "C" fn(
    drawing: *mut DrawingWand,
    x1: c_double,
    y1: c_double,
    x2: c_double,
    y2: c_double,
);

// --- PixelWand operations ---

pub type PixelSetColorFn =
    unsafe extern "C" fn(wand: *mut PixelWand, color: *const c_char) -> MagickBooleanType;
pub type PixelGetStringFn = unsafe extern "C" fn(wand: *const PixelWand) -> *mut c_char;
pub type PixelGetChannelFn = unsafe extern "C" fn(wand: *const PixelWand) -> c_double;
pub type PixelSimilarFn = unsafe extern "C" fn(
    p: *const PixelWand,
    q: *const PixelWand,
    fuzz: c_double,
) -> MagickBooleanType;

// --- PixelIterator operations ---

pub type NewPixelIteratorFn = unsafe extern "C" fn(wand: *mut MagickWand) -> *mut PixelIterator;
pub type ResetIteratorFn = unsafe extern "C" fn(iterator: *mut PixelIterator);
pub type NextIteratorRowFn =
    unsafe extern "C" fn(iterator: *mut PixelIterator, number: *mut size_t) -> *mut *mut PixelWand;
