use std::collections::BTreeMap;
use std::path::PathBuf;

use super::env::EnvOverrides;
use super::settings::Settings;
use crate::loader::candidates::Platform;
use crate::resource::limits::LimitType;

/// ローダーが実際に使う設定。
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub platform: Platform,
    pub magick_home: Option<PathBuf>,
    pub library_suffixes: Vec<String>,
    pub search_system: bool,
    pub resource_limits: BTreeMap<LimitType, u64>,
}

impl LoaderConfig {
    /// 環境変数の値があればそれを、なければ Settings の値を使用する。
    ///
    /// サフィックスは環境変数、設定ファイルの順に連結する。
    pub fn new(settings: &Settings, env: &EnvOverrides) -> Self {
        let mut library_suffixes = env.library_suffixes.clone();
        library_suffixes.extend(settings.library_suffixes.iter().cloned());

        LoaderConfig {
            platform: Platform::current(),
            magick_home: env
                .magick_home
                .clone()
                .or_else(|| settings.magick_home.clone()),
            library_suffixes,
            search_system: settings.search_system,
            resource_limits: settings.resource_limits.clone(),
        }
    }

    /// 環境変数と (指定があれば) 設定ファイルから組み立てる。
    pub fn from_env() -> crate::error::Result<Self> {
        let env = EnvOverrides::from_process_env();
        let settings = super::load_settings(&env)?;
        Ok(Self::new(&settings, &env))
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(&Settings::default(), &EnvOverrides::default())
    }
}
