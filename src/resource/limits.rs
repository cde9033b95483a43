// Native resource limits (pixel cache memory, disk, threads, ...).

use serde::{Deserialize, Serialize};

use crate::error::{Result, WandError};
use crate::ffi::magick_wand_sys::{MAGICK_FALSE, ResourceType};
use crate::resource::state::{LibraryGuard, LibraryState};

/// ImageMagick `ResourceType`, independent of the library's enum ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    Area,
    Disk,
    File,
    Height,
    Map,
    Memory,
    Thread,
    Throttle,
    Time,
    Width,
    ListLength,
}

impl LimitType {
    pub const ALL: [LimitType; 11] = [
        LimitType::Area,
        LimitType::Disk,
        LimitType::File,
        LimitType::Height,
        LimitType::Map,
        LimitType::Memory,
        LimitType::Thread,
        LimitType::Throttle,
        LimitType::Time,
        LimitType::Width,
        LimitType::ListLength,
    ];

    /// Native enum value. ImageMagick 7 moved `HeightResource` up next to
    /// `FileResource` and swapped `Time`/`Throttle`.
    pub fn to_native(self, major: usize) -> ResourceType {
        if major >= 7 {
            match self {
                LimitType::Area => 1,
                LimitType::Disk => 2,
                LimitType::File => 3,
                LimitType::Height => 4,
                LimitType::Map => 5,
                LimitType::Memory => 6,
                LimitType::Thread => 7,
                LimitType::Throttle => 8,
                LimitType::Time => 9,
                LimitType::Width => 10,
                LimitType::ListLength => 11,
            }
        } else {
            match self {
                LimitType::Area => 1,
                LimitType::Disk => 2,
                LimitType::File => 3,
                LimitType::Map => 4,
                LimitType::Memory => 5,
                LimitType::Thread => 6,
                LimitType::Time => 7,
                LimitType::Throttle => 8,
                LimitType::Width => 9,
                LimitType::Height => 10,
                LimitType::ListLength => 11,
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LimitType::Area => "area",
            LimitType::Disk => "disk",
            LimitType::File => "file",
            LimitType::Height => "height",
            LimitType::Map => "map",
            LimitType::Memory => "memory",
            LimitType::Thread => "thread",
            LimitType::Throttle => "throttle",
            LimitType::Time => "time",
            LimitType::Width => "width",
            LimitType::ListLength => "list_length",
        }
    }
}

/// Read and adjust resource limits. Holds a library reference so genesis
/// has run for as long as this value lives.
pub struct ResourceLimits<'a> {
    guard: LibraryGuard<'a>,
}

impl<'a> ResourceLimits<'a> {
    pub fn new(state: &'a LibraryState) -> Result<Self> {
        Ok(ResourceLimits {
            guard: state.guard()?,
        })
    }

    fn native(&self, limit: LimitType) -> ResourceType {
        limit.to_native(self.guard.state().version().major())
    }

    /// Current limit for `limit`.
    pub fn get(&self, limit: LimitType) -> u64 {
        let core = &self.guard.state().table().core;
        unsafe { (core.get_resource_limit)(self.native(limit)) }
    }

    /// Current usage of `limit`.
    pub fn usage(&self, limit: LimitType) -> u64 {
        let core = &self.guard.state().table().core;
        unsafe { (core.get_resource)(self.native(limit)) }
    }

    pub fn set(&self, limit: LimitType, value: u64) -> Result<()> {
        let core = &self.guard.state().table().core;
        let ok = unsafe { (core.set_resource_limit)(self.native(limit), value) };
        if ok == MAGICK_FALSE {
            return Err(WandError::invalid_argument(format!(
                "library rejected {} limit {value}",
                limit.name()
            )));
        }
        Ok(())
    }

    /// Every limit with its current value.
    pub fn all(&self) -> Vec<(LimitType, u64)> {
        LimitType::ALL.iter().map(|&l| (l, self.get(l))).collect()
    }
}
