//! MediatorConfig - Mediator の設定
//!
//! JSON から読み込める。キーが無ければ既定値になる。
//!
//! ```json
//! { "require_notification_handler": true, "publish_strategy": "sequential" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Notification handler の呼び出し方
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategy {
    /// 全 Handler を spawn してから待つ（既定）
    #[default]
    Parallel,
    /// 登録順に 1 件ずつ待つ。失敗しても残りは実行する
    Sequential,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediatorConfig {
    /// true なら Handler 0 件の publish を `NoHandlersRegistered` にする
    pub require_notification_handler: bool,
    pub publish_strategy: PublishStrategy,
}

/// ConfigError は設定の読み込みエラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mediator config: {0}")]
    Json(#[from] serde_json::Error),
}

impl MediatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_require_notification_handler(mut self, require: bool) -> Self {
        self.require_notification_handler = require;
        self
    }

    pub fn with_publish_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.publish_strategy = strategy;
        self
    }
}
