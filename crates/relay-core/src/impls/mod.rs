//! Impls - 汎用の PipelineBehavior 実装
//!
//! # 含まれる実装
//! - **LoggingBehavior**: request ごとの span とログ
//! - **TimingBehavior**: 閾値を超えた request の検出
//! - **PreProcessorBehavior / PostProcessorBehavior**: processor を chain に組み込む

pub mod logging;
pub mod processors;
pub mod timing;

// 主要な型を再エクスポート
pub use self::logging::LoggingBehavior;
pub use self::processors::{PostProcessorBehavior, PreProcessorBehavior};
pub use self::timing::TimingBehavior;
