// Font: a font file plus the optional text settings applied with it.

use std::path::{Path, PathBuf};

/// A font description for [`crate::wand::Drawing::set_font`].
///
/// Only `path` is required. Settings left as `None` keep whatever the
/// drawing already has.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    path: PathBuf,
    size: Option<f64>,
    color: Option<String>,
    antialias: Option<bool>,
}

impl Font {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: None,
            color: None,
            antialias: None,
        }
    }

    /// Point size.
    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    /// Fill colour specification, e.g. `"red"` or `"#00ff00"`.
    pub fn color(mut self, spec: impl Into<String>) -> Self {
        self.color = Some(spec.into());
        self
    }

    pub fn antialias(mut self, antialias: bool) -> Self {
        self.antialias = Some(antialias);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn size_setting(&self) -> Option<f64> {
        self.size
    }

    pub(crate) fn color_setting(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub(crate) fn antialias_setting(&self) -> Option<bool> {
        self.antialias
    }
}
