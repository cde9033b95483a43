use std::path::PathBuf;

/// インストールルートを上書きする環境変数。
pub const MAGICK_HOME_VAR: &str = "MAGICK_HOME";
/// 追加のライブラリ名サフィックス (`;` 区切り) を指定する環境変数。
pub const LIBRARY_SUFFIX_VAR: &str = "WAND_MAGICK_LIBRARY_SUFFIX";
/// 設定ファイルのパスを指定する環境変数。
pub const SETTINGS_VAR: &str = "MAGICK_WAND_SETTINGS";

/// 環境変数から読み取った上書き値。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub magick_home: Option<PathBuf>,
    pub library_suffixes: Vec<String>,
    pub settings_path: Option<PathBuf>,
}

impl EnvOverrides {
    /// プロセスの環境変数から読み取る。
    pub fn from_process_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のルックアップ関数から読み取る。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        EnvOverrides {
            magick_home: non_empty(MAGICK_HOME_VAR).map(PathBuf::from),
            library_suffixes: non_empty(LIBRARY_SUFFIX_VAR)
                .map(|v| parse_suffix_list(&v))
                .unwrap_or_default(),
            settings_path: non_empty(SETTINGS_VAR).map(PathBuf::from),
        }
    }
}

/// `;` 区切りのサフィックス一覧を分割する。空要素は捨てる。
pub fn parse_suffix_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
