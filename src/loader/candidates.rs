// Platform search strategy for the MagickWand shared library.
//
// ImageMagick's library file names are not standardized: they encode the
// major version, the quantum depth and an optional HDRI flag, and differ per
// platform and packager. The search list is the product of a few roots and
// every historically seen name.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::merged::LoaderConfig;

/// Version fragments seen in library names, most specific last.
const VERSIONS: &[&str] = &["", "-7", "-7.Q8", "-7.Q16", "-6", "-Q16", "-Q8", "-6.Q16"];

/// Build options appended to the version fragment.
const OPTIONS: &[&str] = &["", "HDRI", "HDRI-2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }

    /// Library file names for one suffix, in the order they are tried.
    pub fn file_names(self, suffix: &str) -> Vec<String> {
        match self {
            Platform::Windows => vec![
                format!("CORE_RL_wand_{suffix}.dll"),
                format!("CORE_RL_MagickWand_{suffix}.dll"),
                format!("libMagickWand{suffix}.dll"),
            ],
            Platform::MacOs => vec![format!("libMagickWand{suffix}.dylib")],
            Platform::Unix => vec![
                format!("libMagickWand{suffix}.so"),
                format!("libMagickWand{suffix}.so.10"),
                format!("libMagickWand{suffix}.so.9"),
                format!("libMagickWand{suffix}.so.6"),
            ],
        }
    }

    /// Directories package managers install into but the dynamic loader
    /// may not search by default.
    pub fn conventional_dirs(self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &[],
            Platform::MacOs => &["/opt/homebrew/lib", "/usr/local/lib", "/opt/local/lib"],
            Platform::Unix => &[
                "/usr/local/lib",
                "/usr/lib",
                "/usr/lib64",
                "/usr/lib/x86_64-linux-gnu",
                "/usr/lib/aarch64-linux-gnu",
            ],
        }
    }

    /// Where the library lives under an install root.
    fn home_lib_dir(self, home: &Path) -> PathBuf {
        match self {
            Platform::Windows => home.to_path_buf(),
            Platform::MacOs | Platform::Unix => home.join("lib"),
        }
    }
}

/// Which search phase produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Under `MAGICK_HOME` / `magick_home`.
    Override,
    /// A platform-conventional install directory.
    Conventional,
    /// A bare file name resolved by the system dynamic loader.
    SystemLoader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub origin: Origin,
}

impl Candidate {
    /// Absolute candidates can be checked for existence before `dlopen`.
    pub fn is_explicit_path(&self) -> bool {
        self.origin != Origin::SystemLoader
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// User suffixes first, then every version/option combination.
pub fn suffixes(extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = extra.to_vec();
    for version in VERSIONS {
        for option in OPTIONS {
            out.push(format!("{version}{option}"));
        }
    }
    let mut seen = HashSet::new();
    out.retain(|s| seen.insert(s.clone()));
    out
}

/// Ordered, de-duplicated search list for `config`.
pub fn candidates(config: &LoaderConfig) -> Vec<Candidate> {
    let platform = config.platform;
    let suffixes = suffixes(&config.library_suffixes);
    let mut out = Vec::new();

    let push_dir = |out: &mut Vec<Candidate>, dir: &Path, origin: Origin| {
        for suffix in &suffixes {
            for name in platform.file_names(suffix) {
                out.push(Candidate {
                    path: dir.join(name),
                    origin,
                });
            }
        }
    };

    if let Some(home) = &config.magick_home {
        push_dir(&mut out, &platform.home_lib_dir(home), Origin::Override);
    }

    if config.search_system {
        for dir in platform.conventional_dirs() {
            push_dir(&mut out, Path::new(dir), Origin::Conventional);
        }
        for suffix in &suffixes {
            for name in platform.file_names(suffix) {
                out.push(Candidate {
                    path: PathBuf::from(name),
                    origin: Origin::SystemLoader,
                });
            }
        }
    }

    let mut seen = HashSet::new();
    out.retain(|c| seen.insert(c.path.clone()));
    out
}
