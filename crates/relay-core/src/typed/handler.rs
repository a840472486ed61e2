//! Handler traits - Request / Notification を処理する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (`RequestHandler<R>`)
//! - Associated Type の参照 (`R::Response`)
//! - `dyn RequestHandler<R>` として trait object にできる（object-safe）

use crate::domain::{HandlerResult, Notification, Request};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// RequestHandler は Request を処理して Response を返す
///
/// # 使用例
/// ```ignore
/// struct EchoHandler;
///
/// #[async_trait]
/// impl RequestHandler<Echo> for EchoHandler {
///     async fn handle(&self, request: &Echo, _cancel: &CancellationToken) -> HandlerResult<i64> {
///         Ok(request.value * 2)
///     }
/// }
/// ```
///
/// # ジェネリクスによる型安全性
/// - `RequestHandler<Echo>` は `Echo` しか受け取れない
/// - 戻り値の型は `Echo::Response` に固定される
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: &R, cancel: &CancellationToken) -> HandlerResult<R::Response>;
}

/// NotificationHandler は Notification を受け取る（戻り値なし）
///
/// 同じ Notification の他の Handler と並行に呼ばれることがある。
/// 他の Handler の副作用に依存してはいけない。
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    async fn handle(&self, notification: &N, cancel: &CancellationToken) -> HandlerResult<()>;
}
