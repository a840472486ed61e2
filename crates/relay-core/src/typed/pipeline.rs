//! Pipeline - Behavior の連鎖（onion / middleware 順）
//!
//! # 学習ポイント
//! - `Copy` な continuation (`Next`) を値で渡す
//! - slice の `split_first` による再帰的な chain 構築
//! - `BoxFuture` で再帰する async の型サイズを固定する
//!
//! # 実行順
//! behaviors = [A, B, C] のとき:
//!
//! ```text
//! A(pre) → B(pre) → C(pre) → handler → C(post) → B(post) → A(post)
//! ```
//!
//! 最初に登録された Behavior が一番外側になる。

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::handler::RequestHandler;
use crate::domain::{HandlerResult, Request};

/// PipelineBehavior は Handler の前後（または代わり）に処理を差し込む
///
/// `next.run()` を呼ぶと内側の Behavior と Handler が実行される。
/// 呼ばなければそこで chain は終わる（キャッシュからの即時応答など）。
/// 複数回呼ぶこともできる（リトライなど）。回数の制御は実装側の責任。
///
/// # 使用例
/// ```ignore
/// struct Audit;
///
/// #[async_trait]
/// impl PipelineBehavior<Echo> for Audit {
///     async fn handle(
///         &self,
///         request: &Echo,
///         _cancel: &CancellationToken,
///         next: Next<'_, Echo>,
///     ) -> HandlerResult<i64> {
///         println!("before {}", request.value);
///         let out = next.run().await?;
///         println!("after {out}");
///         Ok(out)
///     }
/// }
/// ```
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        cancel: &CancellationToken,
        next: Next<'_, R>,
    ) -> HandlerResult<R::Response>;
}

/// Next は「残りの chain」を表す continuation
///
/// 参照だけを持つので `Copy`。同じ `Next` を何度でも `run()` できる。
pub struct Next<'a, R: Request> {
    request: &'a R,
    cancel: &'a CancellationToken,
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    handler: &'a dyn RequestHandler<R>,
}

impl<R: Request> Clone for Next<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Request> Copy for Next<'_, R> {}

impl<'a, R: Request> Next<'a, R> {
    /// 残りの chain を実行する
    pub fn run(self) -> BoxFuture<'a, HandlerResult<R::Response>> {
        match self.behaviors.split_first() {
            Some((outer, inner)) => outer.handle(
                self.request,
                self.cancel,
                Next {
                    behaviors: inner,
                    ..self
                },
            ),
            None => self.handler.handle(self.request, self.cancel),
        }
    }

    /// まだ実行されていない Behavior の数
    pub fn remaining(&self) -> usize {
        self.behaviors.len()
    }
}

/// Behavior の列と終端の Handler から、1 本の continuation を組み立てる
///
/// 何も実行しない。返された `Next` の `run()` で一番外側の Behavior から動き出す。
pub fn chain<'a, R: Request>(
    request: &'a R,
    cancel: &'a CancellationToken,
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    handler: &'a dyn RequestHandler<R>,
) -> Next<'a, R> {
    Next {
        request,
        cancel,
        behaviors,
        handler,
    }
}
