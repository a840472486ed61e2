//! Ports - 抽象化レイヤー
//!
//! Mediator が外部に求めるインターフェースを定義します。
//! 現状は Handler / Behavior の解決（HandlerRegistry）のみ。

pub mod registry;

pub use self::registry::{HandlerRegistry, ServiceEntry};
