//! relay-core
//!
//! In-process mediator: request を 1 つの Handler に届け、notification を全 Handler に配る。
//!
//! # モジュール構成
//! - **domain**: メッセージ trait と型の識別子、Unit、エラー（MediatorError, AggregateError）
//! - **ports**: 抽象化レイヤー（HandlerRegistry, ServiceEntry）
//! - **typed**: 型付き Handler API（RequestHandler, NotificationHandler, PipelineBehavior, TypedRegistry）
//! - **app**: アプリケーションロジック（Mediator, MediatorBuilder, DelegateCache, MediatorConfig）
//! - **impls**: 汎用の Behavior（LoggingBehavior, TimingBehavior, processors）
//!
//! # 使用例
//! ```ignore
//! let mediator = MediatorBuilder::new()
//!     .request::<Echo, _>(EchoHandler)?
//!     .behavior::<Echo, _>(LoggingBehavior::new())
//!     .notification::<Ping, _>(AuditHandler)
//!     .build()?;
//!
//! assert_eq!(mediator.send(Echo { value: 5 }).await?, 10);
//! mediator.publish(Ping).await?;
//! ```

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{Mediator, MediatorBuilder, MediatorConfig, PublishStrategy};
pub use domain::{HandlerResult, MediatorError, Notification, Request, Unit};
pub use typed::{Next, NotificationHandler, PipelineBehavior, RequestHandler, TypedRegistry};
