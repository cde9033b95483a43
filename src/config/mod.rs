pub mod env;
pub mod merged;
pub mod settings;

use env::EnvOverrides;
use settings::Settings;

/// 環境変数で指定された設定ファイルを読み込む。
///
/// `MAGICK_WAND_SETTINGS` が設定されていればそのファイルを読み込み、
/// 設定されていなければデフォルト設定を返す。
pub fn load_settings(env: &EnvOverrides) -> crate::error::Result<Settings> {
    match &env.settings_path {
        Some(path) => Settings::from_file(path).map_err(|e| {
            crate::error::WandError::config(format!(
                "Failed to load settings from {}: {e}",
                path.display()
            ))
        }),
        None => Ok(Settings::default()),
    }
}
