//! Pre / Post processors
//!
//! Behavior より軽量な「前処理・後処理だけ」のフック。
//! chain への組み込みは `impls::processors` の Behavior が行う。

use crate::domain::{HandlerResult, Request};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Handler の前に呼ばれる
#[async_trait]
pub trait RequestPreProcessor<R: Request>: Send + Sync {
    async fn process(&self, request: &R, cancel: &CancellationToken) -> HandlerResult<()>;
}

/// Handler が成功した後、Response を見て呼ばれる
#[async_trait]
pub trait RequestPostProcessor<R: Request>: Send + Sync {
    async fn process(
        &self,
        request: &R,
        response: &R::Response,
        cancel: &CancellationToken,
    ) -> HandlerResult<()>;
}
