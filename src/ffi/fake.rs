// In-process stand-in for the MagickWand C API, used by unit tests.
//
// Handles are boxed Rust structs tagged with a magic number. Images are kept
// as `image::RgbaImage` and files are encoded/decoded with the `image` crate.
// Call counters are per thread, so tests running in parallel only see their
// own calls.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;
use std::ptr;
use std::slice;
use std::sync::Arc;
use std::thread::LocalKey;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use libc::{c_char, c_double, c_uchar, c_ulong, c_void, size_t, ssize_t};

use super::function_table::*;
use super::magick_wand_sys::*;
use crate::resource::state::LibraryState;

pub const VERSION_NUMBER: size_t = 0x711;
pub const QUANTUM_RANGE: size_t = 65535;
const FORMATS: [&str; 4] = ["GIF", "JPEG", "PNG", "TIFF"];

thread_local! {
    static GENESIS: Cell<usize> = const { Cell::new(0) };
    static TERMINUS: Cell<usize> = const { Cell::new(0) };
    static CREATED: Cell<usize> = const { Cell::new(0) };
    static DESTROYED: Cell<usize> = const { Cell::new(0) };
    static RELINQUISHED: Cell<usize> = const { Cell::new(0) };
    static FAIL_NEXT_NEW: Cell<bool> = const { Cell::new(false) };
    static SEED: Cell<Option<u64>> = const { Cell::new(None) };
    static LIMITS: RefCell<HashMap<ResourceType, u64>> = RefCell::new(HashMap::new());
}

fn bump(counter: &'static LocalKey<Cell<usize>>) {
    counter.set(counter.get() + 1);
}

fn boolean(value: bool) -> MagickBooleanType {
    if value { MAGICK_TRUE } else { MAGICK_FALSE }
}

// --- test helpers ---

/// Counter snapshot; each accessor returns calls made on this thread since
/// `begin`.
pub struct Spy {
    genesis: usize,
    terminus: usize,
    created: usize,
    destroyed: usize,
    relinquished: usize,
}

impl Spy {
    pub fn begin() -> Self {
        Spy {
            genesis: GENESIS.get(),
            terminus: TERMINUS.get(),
            created: CREATED.get(),
            destroyed: DESTROYED.get(),
            relinquished: RELINQUISHED.get(),
        }
    }

    pub fn genesis_calls(&self) -> usize {
        GENESIS.get() - self.genesis
    }

    pub fn terminus_calls(&self) -> usize {
        TERMINUS.get() - self.terminus
    }

    pub fn created(&self) -> usize {
        CREATED.get() - self.created
    }

    pub fn destroyed(&self) -> usize {
        DESTROYED.get() - self.destroyed
    }

    pub fn relinquished(&self) -> usize {
        RELINQUISHED.get() - self.relinquished
    }
}

/// The next `New*` constructor on this thread returns NULL.
pub fn fail_next_constructor() {
    FAIL_NEXT_NEW.set(true);
}

fn constructor_fails() -> bool {
    FAIL_NEXT_NEW.replace(false)
}

/// Limit last stored through `MagickSetResourceLimit` on this thread.
pub fn resource_limit(kind: ResourceType) -> Option<u64> {
    LIMITS.with_borrow(|limits| limits.get(&kind).copied())
}

/// Seed last passed to `MagickSetSeed` on this thread.
pub fn last_seed() -> Option<u64> {
    SEED.get()
}

/// A `malloc`ed copy of `value`, as the library hands out.
pub fn alloc_c_string(value: &str) -> *mut c_char {
    let bytes = value.as_bytes();
    unsafe {
        let buf = libc::malloc(bytes.len() + 1).cast::<u8>();
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
        *buf.add(bytes.len()) = 0;
        buf.cast()
    }
}

fn c_str<'a>(value: *const c_char) -> &'a str {
    if value.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(value) }.to_str().unwrap_or("")
}

/// Table without any optional symbol.
pub fn table() -> FunctionTable {
    FunctionTable {
        core: CoreFns {
            genesis,
            terminus,
            get_version,
            get_release_date,
            get_quantum_depth,
            get_quantum_range,
            query_configure_option,
            query_formats,
            relinquish_memory,
            get_resource,
            get_resource_limit,
            set_resource_limit,
        },
        image: ImageFns {
            new: new_wand,
            handle: handle_fns::<FakeWand>(),
            read_image,
            read_image_blob,
            write_image,
            get_image_blob,
            get_image_width,
            get_image_height,
            get_image_format,
            set_image_format,
            new_image,
            scale_image,
            export_image_pixels,
            constitute_image,
            draw_image,
            get_number_images,
            get_iterator_index,
            set_iterator_index,
            get_image,
            add_image,
            remove_image,
        },
        drawing: DrawingFns {
            new: new_drawing,
            handle: handle_fns::<FakeDrawing>(),
            set_fill_color,
            set_stroke_color,
            set_stroke_width,
            get_stroke_width,
            rectangle,
            line,
            set_font,
            get_font,
            set_font_size,
            get_font_size,
            set_gravity,
            get_gravity,
            set_text_antialias,
            get_text_antialias,
            annotation,
        },
        pixel: PixelFns {
            new: new_pixel,
            handle: handle_fns::<FakePixel>(),
            set_color,
            get_color_as_string,
            get_red,
            get_green,
            get_blue,
            get_alpha,
            is_similar,
        },
        iterator: IteratorFns {
            new: new_iterator,
            handle: handle_fns::<FakeIterator>(),
            reset: reset_iterator,
            next_row,
        },
        optional: OptionalFns::default(),
    }
}

/// Table that also exports every optional symbol.
pub fn table_with_optional() -> FunctionTable {
    let mut table = table();
    table.optional = OptionalFns {
        is_instantiated: Some(is_instantiated),
        set_seed: Some(set_seed),
        auto_orient_image: Some(auto_orient_image),
    };
    table
}

pub fn state() -> Arc<LibraryState> {
    state_with(|s| s)
}

pub fn state_with<F>(configure: F) -> Arc<LibraryState>
where
    F: FnOnce(LibraryState) -> LibraryState,
{
    // SAFETY: every entry of the fake table honours its C signature.
    Arc::new(configure(unsafe { LibraryState::from_table(table()) }))
}

pub fn state_with_optional() -> Arc<LibraryState> {
    Arc::new(unsafe { LibraryState::from_table(table_with_optional()) })
}

// --- handles ---

type Pending = Option<(ExceptionType, String)>;
type Failure = (ExceptionType, String);

const NO_IMAGES: ExceptionType = ERROR_EXCEPTION + 70;
const OPTION_ERROR: ExceptionType = ERROR_EXCEPTION + 10;

fn no_images() -> Failure {
    (NO_IMAGES, "ContainsNoImages `MagickWand-0'".to_string())
}

trait FakeHandle: Sized {
    type Raw;
    const MAGIC: u32;

    fn magic(&self) -> u32;
    fn pending(&mut self) -> &mut Pending;
    fn duplicate(&self) -> Self;
}

fn into_raw<T: FakeHandle>(handle: T) -> *mut T::Raw {
    bump(&CREATED);
    Box::into_raw(Box::new(handle)).cast()
}

fn resolve<'a, T: FakeHandle>(raw: *const T::Raw) -> Option<&'a mut T> {
    if raw.is_null() {
        return None;
    }
    // SAFETY: tests only pass live pointers produced by `into_raw`.
    let handle = unsafe { &mut *raw.cast::<T>().cast_mut() };
    (handle.magic() == T::MAGIC).then_some(handle)
}

fn finish<T: FakeHandle>(handle: &mut T, result: Result<(), Failure>) -> MagickBooleanType {
    match result {
        Ok(()) => MAGICK_TRUE,
        Err(failure) => {
            *handle.pending() = Some(failure);
            MAGICK_FALSE
        }
    }
}

extern "C" fn clone_handle<T: FakeHandle>(raw: *const T::Raw) -> *mut T::Raw {
    match resolve::<T>(raw) {
        Some(handle) => into_raw(handle.duplicate()),
        None => ptr::null_mut(),
    }
}

extern "C" fn destroy_handle<T: FakeHandle>(raw: *mut T::Raw) -> *mut T::Raw {
    if resolve::<T>(raw).is_some() {
        bump(&DESTROYED);
        drop(unsafe { Box::from_raw(raw.cast::<T>()) });
    }
    ptr::null_mut()
}

extern "C" fn is_handle<T: FakeHandle>(raw: *const T::Raw) -> MagickBooleanType {
    boolean(resolve::<T>(raw).is_some())
}

extern "C" fn get_exception<T: FakeHandle>(
    raw: *const T::Raw,
    severity: *mut ExceptionType,
) -> *mut c_char {
    let (code, message) = resolve::<T>(raw)
        .and_then(|h| h.pending().clone())
        .unwrap_or((UNDEFINED_EXCEPTION, String::new()));
    if !severity.is_null() {
        unsafe { *severity = code };
    }
    alloc_c_string(&message)
}

extern "C" fn clear_exception<T: FakeHandle>(raw: *mut T::Raw) -> MagickBooleanType {
    match resolve::<T>(raw) {
        Some(handle) => {
            *handle.pending() = None;
            MAGICK_TRUE
        }
        None => MAGICK_FALSE,
    }
}

fn handle_fns<T: FakeHandle>() -> HandleFns<T::Raw> {
    HandleFns {
        clone: clone_handle::<T>,
        destroy: destroy_handle::<T>,
        is_valid: is_handle::<T>,
        get_exception: get_exception::<T>,
        clear_exception: clear_exception::<T>,
    }
}

#[derive(Clone)]
struct Frame {
    pixels: RgbaImage,
    format: String,
}

impl Frame {
    fn new(pixels: RgbaImage, format: impl Into<String>) -> Self {
        Frame {
            pixels,
            format: format.into(),
        }
    }
}

#[repr(C)]
struct FakeWand {
    magic: u32,
    pending: Pending,
    frames: Vec<Frame>,
    current: usize,
}

impl FakeWand {
    fn empty() -> Self {
        FakeWand {
            magic: Self::MAGIC,
            pending: None,
            frames: Vec::new(),
            current: 0,
        }
    }

    fn frame(&self) -> Result<&Frame, Failure> {
        self.frames.get(self.current).ok_or_else(no_images)
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, Failure> {
        self.frames.get_mut(self.current).ok_or_else(no_images)
    }

    // New frames go after the current one, and the last of them becomes
    // current, so repeated inserts at the last frame append.
    fn insert(&mut self, frames: Vec<Frame>) {
        if frames.is_empty() {
            return;
        }
        let at = if self.frames.is_empty() { 0 } else { self.current + 1 };
        let count = frames.len();
        self.frames.splice(at..at, frames);
        self.current = at + count - 1;
    }
}

impl FakeHandle for FakeWand {
    type Raw = MagickWand;
    const MAGIC: u32 = 0xabac_adab;

    fn magic(&self) -> u32 {
        self.magic
    }
    fn pending(&mut self) -> &mut Pending {
        &mut self.pending
    }
    fn duplicate(&self) -> Self {
        FakeWand {
            magic: Self::MAGIC,
            pending: None,
            frames: self.frames.clone(),
            current: self.current,
        }
    }
}

#[derive(Clone)]
enum Shape {
    Rectangle {
        corners: [f64; 4],
        fill: [f64; 4],
    },
    Line {
        ends: [f64; 4],
        stroke: [f64; 4],
    },
    // Glyphs are approximated by a box of `size / 2` per character whose
    // bottom edge sits on the baseline.
    Text {
        origin: [f64; 2],
        chars: usize,
        size: f64,
        fill: [f64; 4],
        font: Option<String>,
    },
}

#[repr(C)]
struct FakeDrawing {
    magic: u32,
    pending: Pending,
    fill: [f64; 4],
    stroke: [f64; 4],
    stroke_width: f64,
    font: Option<String>,
    font_size: f64,
    gravity: GravityType,
    text_antialias: bool,
    shapes: Vec<Shape>,
}

impl FakeHandle for FakeDrawing {
    type Raw = DrawingWand;
    const MAGIC: u32 = 0xdabb_1e55;

    fn magic(&self) -> u32 {
        self.magic
    }
    fn pending(&mut self) -> &mut Pending {
        &mut self.pending
    }
    fn duplicate(&self) -> Self {
        FakeDrawing {
            magic: Self::MAGIC,
            pending: None,
            fill: self.fill,
            stroke: self.stroke,
            stroke_width: self.stroke_width,
            font: self.font.clone(),
            font_size: self.font_size,
            gravity: self.gravity,
            text_antialias: self.text_antialias,
            shapes: self.shapes.clone(),
        }
    }
}

#[repr(C)]
struct FakePixel {
    magic: u32,
    pending: Pending,
    rgba: [f64; 4],
}

impl FakePixel {
    fn new(rgba: [f64; 4]) -> Self {
        FakePixel {
            magic: Self::MAGIC,
            pending: None,
            rgba,
        }
    }

    fn from_rgba8(px: Rgba<u8>) -> Self {
        FakePixel::new(px.0.map(|c| f64::from(c) / 255.0))
    }
}

impl FakeHandle for FakePixel {
    type Raw = PixelWand;
    const MAGIC: u32 = 0x91c5_e1aa;

    fn magic(&self) -> u32 {
        self.magic
    }
    fn pending(&mut self) -> &mut Pending {
        &mut self.pending
    }
    fn duplicate(&self) -> Self {
        FakePixel::new(self.rgba)
    }
}

#[repr(C)]
struct FakeIterator {
    magic: u32,
    pending: Pending,
    wand: *mut MagickWand,
    row: u32,
    // Pixel wands of the row last returned; owned by the iterator.
    current: Vec<*mut PixelWand>,
}

impl FakeIterator {
    fn release_row(&mut self) {
        for pixel in self.current.drain(..) {
            drop(unsafe { Box::from_raw(pixel.cast::<FakePixel>()) });
        }
    }
}

impl Drop for FakeIterator {
    fn drop(&mut self) {
        self.release_row();
    }
}

impl FakeHandle for FakeIterator {
    type Raw = PixelIterator;
    const MAGIC: u32 = 0x17e4_a702;

    fn magic(&self) -> u32 {
        self.magic
    }
    fn pending(&mut self) -> &mut Pending {
        &mut self.pending
    }
    fn duplicate(&self) -> Self {
        FakeIterator {
            magic: Self::MAGIC,
            pending: None,
            wand: self.wand,
            row: self.row,
            current: Vec::new(),
        }
    }
}

// --- core ---

extern "C" fn genesis() {
    bump(&GENESIS);
}

extern "C" fn terminus() {
    bump(&TERMINUS);
}

extern "C" fn is_instantiated() -> MagickBooleanType {
    MAGICK_TRUE
}

extern "C" fn get_version(version: *mut size_t) -> *const c_char {
    if !version.is_null() {
        unsafe { *version = VERSION_NUMBER };
    }
    c"ImageMagick 7.1.1-15 Q16-HDRI x86_64 fake".as_ptr()
}

extern "C" fn get_release_date() -> *const c_char {
    c"2023-08-06".as_ptr()
}

extern "C" fn get_quantum_depth(depth: *mut size_t) -> *const c_char {
    if !depth.is_null() {
        unsafe { *depth = 16 };
    }
    c"Q16".as_ptr()
}

extern "C" fn get_quantum_range(range: *mut size_t) -> *const c_char {
    if !range.is_null() {
        unsafe { *range = QUANTUM_RANGE };
    }
    c"65535".as_ptr()
}

extern "C" fn query_configure_option(option: *const c_char) -> *mut c_char {
    match c_str(option) {
        "FEATURES" => alloc_c_string("Cipher DPC HDRI OpenMP"),
        "DELEGATES" => alloc_c_string("jpeg png tiff zlib"),
        _ => ptr::null_mut(),
    }
}

fn glob_match(pattern: &[u8], name: &[u8]) -> bool {
    match (pattern.first(), name.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], name) || (!name.is_empty() && glob_match(pattern, &name[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &name[1..]),
        (Some(p), Some(n)) if p.eq_ignore_ascii_case(n) => glob_match(&pattern[1..], &name[1..]),
        _ => false,
    }
}

extern "C" fn query_formats(pattern: *const c_char, number: *mut size_t) -> *mut *mut c_char {
    let pattern = c_str(pattern).as_bytes();
    let names: Vec<&str> = FORMATS
        .iter()
        .copied()
        .filter(|name| glob_match(pattern, name.as_bytes()))
        .collect();
    unsafe {
        let list = libc::malloc(names.len().max(1) * size_of::<*mut c_char>()).cast::<*mut c_char>();
        for (i, name) in names.iter().enumerate() {
            *list.add(i) = alloc_c_string(name);
        }
        if !number.is_null() {
            *number = names.len();
        }
        list
    }
}

extern "C" fn relinquish_memory(memory: *mut c_void) -> *mut c_void {
    if !memory.is_null() {
        bump(&RELINQUISHED);
        unsafe { libc::free(memory) };
    }
    ptr::null_mut()
}

extern "C" fn get_resource(_kind: ResourceType) -> MagickSizeType {
    0
}

extern "C" fn get_resource_limit(kind: ResourceType) -> MagickSizeType {
    LIMITS.with_borrow(|limits| limits.get(&kind).copied().unwrap_or(u64::MAX))
}

extern "C" fn set_resource_limit(kind: ResourceType, limit: MagickSizeType) -> MagickBooleanType {
    LIMITS.with_borrow_mut(|limits| limits.insert(kind, limit));
    MAGICK_TRUE
}

extern "C" fn set_seed(seed: c_ulong) {
    SEED.set(Some(seed as u64));
}

// --- image ---

fn format_name(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("PNG"),
        ImageFormat::Jpeg => Some("JPEG"),
        ImageFormat::Gif => Some("GIF"),
        ImageFormat::Tiff => Some("TIFF"),
        ImageFormat::Bmp => Some("BMP"),
        _ => None,
    }
}

fn image_format(name: &str) -> Option<ImageFormat> {
    ImageFormat::from_extension(name.to_ascii_lowercase()).filter(|f| format_name(*f).is_some())
}

fn encode(image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, Failure> {
    let dynamic = DynamicImage::ImageRgba8(image.clone());
    let dynamic = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(dynamic.to_rgb8()),
        _ => dynamic,
    };
    let mut out = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut out, format)
        .map_err(|e| (ERROR_EXCEPTION + 50, e.to_string()))?;
    Ok(out.into_inner())
}

fn to_rgba8(rgba: [f64; 4]) -> Rgba<u8> {
    Rgba(rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
}

extern "C" fn new_wand() -> *mut MagickWand {
    if constructor_fails() {
        return ptr::null_mut();
    }
    into_raw(FakeWand::empty())
}

fn read_file(wand: &mut FakeWand, path: &str) -> Result<(), Failure> {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    let format = ImageFormat::from_path(path)
        .ok()
        .and_then(format_name)
        .unwrap_or("PNG");

    if name.starts_with("fatal") {
        return Err((FATAL_ERROR_EXCEPTION + 25, format!("unable to read image `{path}'")));
    }
    if name.starts_with("warn") {
        wand.insert(vec![Frame::new(RgbaImage::from_pixel(4, 3, Rgba([255; 4])), format)]);
        wand.pending = Some((WARNING_EXCEPTION + 25, format!("premature end of image `{path}'")));
        return Ok(());
    }
    if !Path::new(path).exists() {
        return Err((
            ERROR_EXCEPTION + 30,
            format!("unable to open image `{path}': No such file or directory"),
        ));
    }
    let decoded = image::open(path).map_err(|e| (ERROR_EXCEPTION + 25, e.to_string()))?;
    wand.insert(vec![Frame::new(decoded.to_rgba8(), format)]);
    Ok(())
}

extern "C" fn read_image(w: *mut MagickWand, filename: *const c_char) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = read_file(wand, c_str(filename));
    finish(wand, result)
}

extern "C" fn read_image_blob(
    w: *mut MagickWand,
    blob: *const c_void,
    length: size_t,
) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = (|| -> Result<(), Failure> {
        if blob.is_null() || length == 0 {
            return Err((ERROR_EXCEPTION + 35, "ZeroLengthBlobNotPermitted".to_string()));
        }
        let bytes = unsafe { slice::from_raw_parts(blob.cast::<u8>(), length) };
        let format = image::guess_format(bytes)
            .ok()
            .filter(|f| format_name(*f).is_some())
            .ok_or((
                ERROR_EXCEPTION + 20,
                "no decode delegate for this image format".to_string(),
            ))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| (ERROR_EXCEPTION + 25, e.to_string()))?;
        let name = format_name(format).unwrap_or_default();
        wand.insert(vec![Frame::new(decoded.to_rgba8(), name)]);
        Ok(())
    })();
    finish(wand, result)
}

extern "C" fn write_image(w: *mut MagickWand, filename: *const c_char) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let path = c_str(filename);
    let result = (|| -> Result<(), Failure> {
        let frame = wand.frame()?;
        let format = ImageFormat::from_path(path)
            .ok()
            .filter(|f| format_name(*f).is_some())
            .or_else(|| image_format(&frame.format))
            .ok_or((
                ERROR_EXCEPTION + 20,
                format!("no encode delegate for this image format `{path}'"),
            ))?;
        let bytes = encode(&frame.pixels, format)?;
        std::fs::write(path, bytes)
            .map_err(|e| (ERROR_EXCEPTION + 30, format!("unable to open image `{path}': {e}")))?;
        Ok(())
    })();
    finish(wand, result)
}

extern "C" fn get_image_blob(w: *mut MagickWand, length: *mut size_t) -> *mut u8 {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return ptr::null_mut();
    };
    let result = wand.frame().and_then(|frame| {
        let format = image_format(&frame.format).ok_or((
            ERROR_EXCEPTION + 20,
            "no encode delegate for this image format".to_string(),
        ))?;
        encode(&frame.pixels, format)
    });
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(failure) => {
            wand.pending = Some(failure);
            if !length.is_null() {
                unsafe { *length = 0 };
            }
            return ptr::null_mut();
        }
    };
    unsafe {
        let buf = libc::malloc(bytes.len().max(1)).cast::<u8>();
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
        if !length.is_null() {
            *length = bytes.len();
        }
        buf
    }
}

fn frame_dimension(w: *mut MagickWand, pick: fn(&RgbaImage) -> u32) -> size_t {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return 0;
    };
    match wand.frame() {
        Ok(frame) => pick(&frame.pixels) as size_t,
        Err(failure) => {
            wand.pending = Some(failure);
            0
        }
    }
}

extern "C" fn get_image_width(w: *mut MagickWand) -> size_t {
    frame_dimension(w, RgbaImage::width)
}

extern "C" fn get_image_height(w: *mut MagickWand) -> size_t {
    frame_dimension(w, RgbaImage::height)
}

extern "C" fn get_image_format(w: *mut MagickWand) -> *mut c_char {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return ptr::null_mut();
    };
    match wand.frame() {
        Ok(frame) => alloc_c_string(&frame.format),
        Err(failure) => {
            wand.pending = Some(failure);
            ptr::null_mut()
        }
    }
}

extern "C" fn set_image_format(w: *mut MagickWand, format: *const c_char) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let name = c_str(format);
    let canonical = image_format(name).and_then(format_name);
    let result = wand.frame_mut().and_then(|frame| match canonical {
        None => Err((OPTION_ERROR, format!("UnrecognizedImageFormat `{name}'"))),
        Some(canonical) => {
            frame.format = canonical.to_string();
            Ok(())
        }
    });
    finish(wand, result)
}

extern "C" fn new_image(
    w: *mut MagickWand,
    columns: size_t,
    rows: size_t,
    background: *const PixelWand,
) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = if columns == 0 || rows == 0 {
        Err((OPTION_ERROR, format!("NegativeOrZeroImageSize `{columns}x{rows}'")))
    } else {
        let fill = resolve::<FakePixel>(background).map_or([0.0; 4], |p| p.rgba);
        let pixels = RgbaImage::from_pixel(columns as u32, rows as u32, to_rgba8(fill));
        wand.insert(vec![Frame::new(pixels, "")]);
        Ok(())
    };
    finish(wand, result)
}

extern "C" fn scale_image(w: *mut MagickWand, columns: size_t, rows: size_t) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = wand.frame_mut().and_then(|frame| {
        if columns == 0 || rows == 0 {
            return Err((OPTION_ERROR, format!("NegativeOrZeroImageSize `{columns}x{rows}'")));
        }
        frame.pixels = image::imageops::resize(
            &frame.pixels,
            columns as u32,
            rows as u32,
            image::imageops::FilterType::Nearest,
        );
        Ok(())
    });
    finish(wand, result)
}

fn check_pixel_layout(map: *const c_char, storage: StorageType) -> Result<(), Failure> {
    if c_str(map) != "RGBA" || storage != CHAR_PIXEL {
        return Err((
            OPTION_ERROR,
            format!("UnrecognizedPixelMap `{}'", c_str(map)),
        ));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
extern "C" fn export_image_pixels(
    w: *mut MagickWand,
    x: ssize_t,
    y: ssize_t,
    columns: size_t,
    rows: size_t,
    map: *const c_char,
    storage: StorageType,
    pixels: *mut c_void,
) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = (|| -> Result<(), Failure> {
        check_pixel_layout(map, storage)?;
        let image = &wand.frame()?.pixels;
        let inside = x >= 0
            && y >= 0
            && x as usize + columns <= image.width() as usize
            && y as usize + rows <= image.height() as usize;
        if !inside || pixels.is_null() {
            return Err((OPTION_ERROR, "GeometryDoesNotContainImage".to_string()));
        }
        let out = unsafe { slice::from_raw_parts_mut(pixels.cast::<u8>(), columns * rows * 4) };
        for row in 0..rows {
            for col in 0..columns {
                let px = image.get_pixel((x as usize + col) as u32, (y as usize + row) as u32);
                let at = (row * columns + col) * 4;
                out[at..at + 4].copy_from_slice(&px.0);
            }
        }
        Ok(())
    })();
    finish(wand, result)
}

extern "C" fn constitute_image(
    w: *mut MagickWand,
    columns: size_t,
    rows: size_t,
    map: *const c_char,
    storage: StorageType,
    pixels: *const c_void,
) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = (|| -> Result<(), Failure> {
        check_pixel_layout(map, storage)?;
        if columns == 0 || rows == 0 || pixels.is_null() {
            return Err((OPTION_ERROR, format!("NegativeOrZeroImageSize `{columns}x{rows}'")));
        }
        let data = unsafe { slice::from_raw_parts(pixels.cast::<u8>(), columns * rows * 4) };
        let image = RgbaImage::from_raw(columns as u32, rows as u32, data.to_vec())
            .ok_or((OPTION_ERROR, "pixel buffer too small".to_string()))?;
        wand.insert(vec![Frame::new(image, "")]);
        Ok(())
    })();
    finish(wand, result)
}

fn put(image: &mut RgbaImage, x: f64, y: f64, color: [f64; 4]) {
    let (x, y) = (x.round(), y.round());
    if x >= 0.0 && y >= 0.0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, to_rgba8(color));
    }
}

fn fill_box(image: &mut RgbaImage, [x1, y1, x2, y2]: [f64; 4], color: [f64; 4]) {
    let (left, right) = (x1.min(x2).round() as i64, x1.max(x2).round() as i64);
    let (top, bottom) = (y1.min(y2).round() as i64, y1.max(y2).round() as i64);
    for y in top..=bottom {
        for x in left..=right {
            put(image, x as f64, y as f64, color);
        }
    }
}

// Returns a warning for text whose font file cannot be read; the default
// font is used instead, as the library does.
fn rasterize(image: &mut RgbaImage, shapes: &[Shape]) -> Pending {
    let mut warning = None;
    for shape in shapes {
        match shape {
            Shape::Rectangle { corners, fill } => fill_box(image, *corners, *fill),
            Shape::Line {
                ends: [x1, y1, x2, y2],
                stroke,
            } => {
                let steps = (x2 - x1).abs().max((y2 - y1).abs()).ceil().max(1.0);
                for i in 0..=(steps as i64) {
                    let t = i as f64 / steps;
                    put(image, x1 + (x2 - x1) * t, y1 + (y2 - y1) * t, *stroke);
                }
            }
            Shape::Text {
                origin: [x, y],
                chars,
                size,
                fill,
                font,
            } => {
                if let Some(font) = font.as_deref().filter(|f| !Path::new(f).exists()) {
                    warning = Some((WARNING_EXCEPTION + 5, format!("UnableToReadFont `{font}'")));
                }
                let width = *chars as f64 * size / 2.0;
                fill_box(image, [*x, y - size + 1.0, x + width - 1.0, *y], *fill);
            }
        }
    }
    warning
}

extern "C" fn draw_image(w: *mut MagickWand, d: *const DrawingWand) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let Some(drawing) = resolve::<FakeDrawing>(d) else {
        return finish(wand, Err((ERROR_EXCEPTION + 70, "InvalidDrawingWand".to_string())));
    };
    let shapes = drawing.shapes.clone();
    let result = wand
        .frame_mut()
        .map(|frame| rasterize(&mut frame.pixels, &shapes));
    match result {
        Ok(warning) => {
            wand.pending = warning;
            MAGICK_TRUE
        }
        Err(failure) => finish(wand, Err(failure)),
    }
}

extern "C" fn auto_orient_image(w: *mut MagickWand) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = wand.frame().map(|_| ());
    finish(wand, result)
}

// --- image list ---

extern "C" fn get_number_images(w: *mut MagickWand) -> size_t {
    resolve::<FakeWand>(w).map_or(0, |wand| wand.frames.len())
}

extern "C" fn get_iterator_index(w: *mut MagickWand) -> ssize_t {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return -1;
    };
    if wand.frames.is_empty() {
        wand.pending = Some(no_images());
        return -1;
    }
    wand.current as ssize_t
}

extern "C" fn set_iterator_index(w: *mut MagickWand, index: ssize_t) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    if wand.frames.is_empty() {
        return MAGICK_FALSE;
    }
    let result = usize::try_from(index)
        .ok()
        .filter(|&i| i < wand.frames.len())
        .map(|i| wand.current = i)
        .ok_or((ERROR_EXCEPTION + 70, "NoSuchImage `MagickWand-0'".to_string()));
    finish(wand, result)
}

extern "C" fn get_image(w: *mut MagickWand) -> *mut MagickWand {
    if constructor_fails() {
        return ptr::null_mut();
    }
    let Some(wand) = resolve::<FakeWand>(w) else {
        return ptr::null_mut();
    };
    match wand.frame() {
        Ok(frame) => {
            let mut single = FakeWand::empty();
            single.insert(vec![frame.clone()]);
            into_raw(single)
        }
        Err(failure) => {
            wand.pending = Some(failure);
            ptr::null_mut()
        }
    }
}

extern "C" fn add_image(w: *mut MagickWand, add: *const MagickWand) -> MagickBooleanType {
    let Some(added) = resolve::<FakeWand>(add).map(|a| a.frames.clone()) else {
        return MAGICK_FALSE;
    };
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = if added.is_empty() {
        Err(no_images())
    } else {
        wand.insert(added);
        Ok(())
    };
    finish(wand, result)
}

extern "C" fn remove_image(w: *mut MagickWand) -> MagickBooleanType {
    let Some(wand) = resolve::<FakeWand>(w) else {
        return MAGICK_FALSE;
    };
    let result = if wand.frames.is_empty() {
        Err(no_images())
    } else {
        wand.frames.remove(wand.current);
        // The next frame takes the removed one's place, or the previous one
        // when the last frame was removed.
        wand.current = wand.current.min(wand.frames.len().saturating_sub(1));
        Ok(())
    };
    finish(wand, result)
}

// --- drawing ---

extern "C" fn new_drawing() -> *mut DrawingWand {
    if constructor_fails() {
        return ptr::null_mut();
    }
    into_raw(FakeDrawing {
        magic: FakeDrawing::MAGIC,
        pending: None,
        fill: [0.0, 0.0, 0.0, 1.0],
        stroke: [0.0; 4],
        stroke_width: 1.0,
        font: None,
        font_size: 12.0,
        gravity: 0,
        text_antialias: true,
        shapes: Vec::new(),
    })
}

extern "C" fn set_fill_color(d: *mut DrawingWand, color: *const PixelWand) {
    if let (Some(drawing), Some(pixel)) = (resolve::<FakeDrawing>(d), resolve::<FakePixel>(color)) {
        drawing.fill = pixel.rgba;
    }
}

extern "C" fn set_stroke_color(d: *mut DrawingWand, color: *const PixelWand) {
    if let (Some(drawing), Some(pixel)) = (resolve::<FakeDrawing>(d), resolve::<FakePixel>(color)) {
        drawing.stroke = pixel.rgba;
    }
}

extern "C" fn set_stroke_width(d: *mut DrawingWand, width: c_double) {
    if let Some(drawing) = resolve::<FakeDrawing>(d) {
        drawing.stroke_width = width;
    }
}

extern "C" fn get_stroke_width(d: *const DrawingWand) -> c_double {
    resolve::<FakeDrawing>(d).map_or(0.0, |drawing| drawing.stroke_width)
}

extern "C" fn rectangle(d: *mut DrawingWand, x1: c_double, y1: c_double, x2: c_double, y2: c_double) {
    if let Some(drawing) = resolve::<FakeDrawing>(d) {
        let fill = drawing.fill;
        drawing.shapes.push(Shape::Rectangle {
            corners: [x1, y1, x2, y2],
            fill,
        });
    }
}

extern "C" fn line(d: *mut DrawingWand, x1: c_double, y1: c_double, x2: c_double, y2: c_double) {
    if let Some(drawing) = resolve::<FakeDrawing>(d) {
        let stroke = drawing.stroke;
        drawing.shapes.push(Shape::Line {
            ends: [x1, y1, x2, y2],
            stroke,
        });
    }
}

extern "C" fn set_font(d: *mut DrawingWand, font_name: *const c_char) -> MagickBooleanType {
    let Some(drawing) = resolve::<FakeDrawing>(d) else {
        return MAGICK_FALSE;
    };
    let name = c_str(font_name);
    let result = if name.is_empty() {
        Err((OPTION_ERROR, "UnrecognizedFont `'".to_string()))
    } else {
        drawing.font = Some(name.to_string());
        Ok(())
    };
    finish(drawing, result)
}

extern "C" fn get_font(d: *const DrawingWand) -> *mut c_char {
    resolve::<FakeDrawing>(d)
        .and_then(|drawing| drawing.font.as_deref().map(alloc_c_string))
        .unwrap_or(ptr::null_mut())
}

extern "C" fn set_font_size(d: *mut DrawingWand, size: c_double) {
    if let Some(drawing) = resolve::<FakeDrawing>(d) {
        drawing.font_size = size;
    }
}

extern "C" fn get_font_size(d: *const DrawingWand) -> c_double {
    resolve::<FakeDrawing>(d).map_or(0.0, |drawing| drawing.font_size)
}

extern "C" fn set_gravity(d: *mut DrawingWand, gravity: GravityType) {
    if let Some(drawing) = resolve::<FakeDrawing>(d) {
        drawing.gravity = gravity;
    }
}

extern "C" fn get_gravity(d: *const DrawingWand) -> GravityType {
    resolve::<FakeDrawing>(d).map_or(0, |drawing| drawing.gravity)
}

extern "C" fn set_text_antialias(d: *mut DrawingWand, value: MagickBooleanType) {
    if let Some(drawing) = resolve::<FakeDrawing>(d) {
        drawing.text_antialias = value != MAGICK_FALSE;
    }
}

extern "C" fn get_text_antialias(d: *const DrawingWand) -> MagickBooleanType {
    boolean(resolve::<FakeDrawing>(d).is_some_and(|drawing| drawing.text_antialias))
}

extern "C" fn annotation(d: *mut DrawingWand, x: c_double, y: c_double, text: *const c_uchar) {
    let Some(drawing) = resolve::<FakeDrawing>(d) else {
        return;
    };
    let chars = c_str(text.cast()).chars().count();
    let shape = Shape::Text {
        origin: [x, y],
        chars,
        size: drawing.font_size,
        fill: drawing.fill,
        font: drawing.font.clone(),
    };
    drawing.shapes.push(shape);
}

// --- pixel ---

extern "C" fn new_pixel() -> *mut PixelWand {
    if constructor_fails() {
        return ptr::null_mut();
    }
    into_raw(FakePixel::new([0.0, 0.0, 0.0, 1.0]))
}

fn parse_color(spec: &str) -> Option<[f64; 4]> {
    let spec = spec.trim().to_ascii_lowercase();
    let named = match spec.as_str() {
        "white" => Some([1.0, 1.0, 1.0, 1.0]),
        "black" => Some([0.0, 0.0, 0.0, 1.0]),
        "red" => Some([1.0, 0.0, 0.0, 1.0]),
        "lime" => Some([0.0, 1.0, 0.0, 1.0]),
        "green" => Some([0.0, 128.0 / 255.0, 0.0, 1.0]),
        "blue" => Some([0.0, 0.0, 1.0, 1.0]),
        "yellow" => Some([1.0, 1.0, 0.0, 1.0]),
        "none" | "transparent" => Some([0.0; 4]),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    if let Some(hex) = spec.strip_prefix('#') {
        let channel = |i: usize| {
            u8::from_str_radix(hex.get(i..i + 2)?, 16)
                .ok()
                .map(|v| f64::from(v) / 255.0)
        };
        return match hex.len() {
            6 => Some([channel(0)?, channel(2)?, channel(4)?, 1.0]),
            8 => Some([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
            _ => None,
        };
    }

    let (body, with_alpha) = if let Some(body) = spec
        .strip_prefix("srgba(")
        .or_else(|| spec.strip_prefix("rgba("))
    {
        (body, true)
    } else if let Some(body) = spec.strip_prefix("srgb(").or_else(|| spec.strip_prefix("rgb(")) {
        (body, false)
    } else {
        return None;
    };
    let parts: Vec<f64> = body
        .strip_suffix(')')?
        .split(',')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match (parts.as_slice(), with_alpha) {
        ([r, g, b], false) => Some([r / 255.0, g / 255.0, b / 255.0, 1.0]),
        ([r, g, b, a], true) => Some([r / 255.0, g / 255.0, b / 255.0, *a]),
        _ => None,
    }
}

fn color_string(rgba: [f64; 4]) -> String {
    let [r, g, b, _] = to_rgba8(rgba).0;
    if rgba[3] >= 1.0 {
        return format!("srgb({r},{g},{b})");
    }
    let alpha = format!("{:.4}", rgba[3].clamp(0.0, 1.0));
    let alpha = alpha.trim_end_matches('0').trim_end_matches('.');
    format!("srgba({r},{g},{b},{alpha})")
}

extern "C" fn set_color(p: *mut PixelWand, color: *const c_char) -> MagickBooleanType {
    let Some(pixel) = resolve::<FakePixel>(p) else {
        return MAGICK_FALSE;
    };
    let spec = c_str(color);
    let result = match parse_color(spec) {
        Some(rgba) => {
            pixel.rgba = rgba;
            Ok(())
        }
        None => Err((OPTION_ERROR, format!("UnrecognizedColor `{spec}'"))),
    };
    finish(pixel, result)
}

extern "C" fn get_color_as_string(p: *const PixelWand) -> *mut c_char {
    match resolve::<FakePixel>(p) {
        Some(pixel) => alloc_c_string(&color_string(pixel.rgba)),
        None => ptr::null_mut(),
    }
}

fn channel(p: *const PixelWand, index: usize) -> c_double {
    resolve::<FakePixel>(p).map_or(0.0, |pixel| pixel.rgba[index])
}

extern "C" fn get_red(p: *const PixelWand) -> c_double {
    channel(p, 0)
}

extern "C" fn get_green(p: *const PixelWand) -> c_double {
    channel(p, 1)
}

extern "C" fn get_blue(p: *const PixelWand) -> c_double {
    channel(p, 2)
}

extern "C" fn get_alpha(p: *const PixelWand) -> c_double {
    channel(p, 3)
}

extern "C" fn is_similar(p: *const PixelWand, q: *const PixelWand, fuzz: c_double) -> MagickBooleanType {
    let (Some(p), Some(q)) = (resolve::<FakePixel>(p), resolve::<FakePixel>(q)) else {
        return MAGICK_FALSE;
    };
    let range = QUANTUM_RANGE as f64;
    let distance = p
        .rgba
        .iter()
        .zip(q.rgba.iter())
        .map(|(a, b)| ((a - b) * range).powi(2))
        .sum::<f64>()
        .sqrt();
    boolean(distance <= fuzz)
}

// --- iterator ---

extern "C" fn new_iterator(w: *mut MagickWand) -> *mut PixelIterator {
    if constructor_fails() {
        return ptr::null_mut();
    }
    let Some(wand) = resolve::<FakeWand>(w) else {
        return ptr::null_mut();
    };
    if let Err(failure) = wand.frame() {
        wand.pending = Some(failure);
        return ptr::null_mut();
    }
    into_raw(FakeIterator {
        magic: FakeIterator::MAGIC,
        pending: None,
        wand: w,
        row: 0,
        current: Vec::new(),
    })
}

extern "C" fn reset_iterator(it: *mut PixelIterator) {
    if let Some(iterator) = resolve::<FakeIterator>(it) {
        iterator.row = 0;
    }
}

extern "C" fn next_row(it: *mut PixelIterator, number: *mut size_t) -> *mut *mut PixelWand {
    let set_number = |n: usize| {
        if !number.is_null() {
            unsafe { *number = n };
        }
    };
    let Some(iterator) = resolve::<FakeIterator>(it) else {
        set_number(0);
        return ptr::null_mut();
    };
    iterator.release_row();

    let image = resolve::<FakeWand>(iterator.wand)
        .and_then(|wand| wand.frame().ok())
        .map(|frame| &frame.pixels);
    let row = iterator.row;
    let Some(image) = image.filter(|image| row < image.height()) else {
        set_number(0);
        return ptr::null_mut();
    };

    iterator.current = (0..image.width())
        .map(|x| {
            let pixel = FakePixel::from_rgba8(*image.get_pixel(x, row));
            Box::into_raw(Box::new(pixel)).cast::<PixelWand>()
        })
        .collect();
    iterator.row += 1;
    set_number(iterator.current.len());
    iterator.current.as_mut_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"*", b"PNG"));
        assert!(glob_match(b"p*", b"PNG"));
        assert!(glob_match(b"?IF", b"GIF"));
        assert!(!glob_match(b"J*G", b"PNG"));
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("red"), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(parse_color("#ff000080").map(|c| to_rgba8(c).0), Some([255, 0, 0, 128]));
        assert_eq!(parse_color("srgb(0,0,255)"), Some([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(parse_color("nonsense"), None);
    }

    #[test]
    fn test_color_string_trims_alpha() {
        assert_eq!(color_string([1.0, 0.0, 0.0, 1.0]), "srgb(255,0,0)");
        assert_eq!(color_string([1.0, 0.0, 0.0, 0.5]), "srgba(255,0,0,0.5)");
        assert_eq!(color_string([0.0; 4]), "srgba(0,0,0,0)");
    }
}
