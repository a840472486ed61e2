//! Typed - 型付き Handler API
//!
//! このモジュールは Request と Handler の対応を型で保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `RequestHandler<R>`, `NotificationHandler<N>`, `PipelineBehavior<R>` - 型安全
//! - **内部（Dyn）**: `ports::ServiceEntry` - `TypeId` をキーにした type erasure

pub mod handler;
pub mod pipeline;
pub mod processor;
pub mod registry;

// 主要な trait/型 を再エクスポート
pub use self::handler::{NotificationHandler, RequestHandler};
pub use self::pipeline::{Next, PipelineBehavior, chain};
pub use self::processor::{RequestPostProcessor, RequestPreProcessor};
pub use self::registry::{RegistryError, TypedRegistry};
