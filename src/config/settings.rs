use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::resource::limits::LimitType;

/// ローダー設定ファイル (YAML) の内容。
///
/// 全フィールドが省略可能で、省略時は [`Settings::default`] の値を使う。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ImageMagick のインストールルート (`<home>/lib/libMagickWand*.so` を探索する)。
    pub magick_home: Option<PathBuf>,
    /// 組み込みの候補より先に試すライブラリ名サフィックス (例: `-7.Q16HDRI`)。
    pub library_suffixes: Vec<String>,
    /// プラットフォーム標準の場所とシステムローダーの検索パスも探索するか。
    pub search_system: bool,
    /// genesis 直後に適用するリソース上限。
    pub resource_limits: BTreeMap<LimitType, u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            magick_home: None,
            library_suffixes: Vec::new(),
            search_system: true,
            resource_limits: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::WandError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
