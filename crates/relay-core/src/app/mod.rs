//! App - アプリケーション層
//!
//! このモジュールは、ports と typed を組み合わせて Mediator を実装します。
//!
//! # 主要コンポーネント
//! - **Mediator**: send / publish の入り口
//! - **MediatorBuilder**: Mediator の構築とワイヤリング
//! - **DelegateCache**: 型ごとの thunk のキャッシュ
//! - **MediatorConfig**: 設定（JSON から読み込み可）

pub mod builder;
pub mod cache;
pub mod config;
pub mod mediator;
pub mod wrapper;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, MediatorBuilder};
pub use self::cache::DelegateCache;
pub use self::config::{ConfigError, MediatorConfig, PublishStrategy};
pub use self::mediator::Mediator;
pub use self::wrapper::{AnyNotification, AnyRequest};
