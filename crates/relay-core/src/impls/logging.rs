//! LoggingBehavior - request ごとに span を張ってログを出す
//!
//! どの Request 型にも付けられる（`PipelineBehavior<R>` を全ての `R` に実装）。

use std::any::type_name;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};

use crate::domain::{HandlerResult, Request};
use crate::typed::{Next, PipelineBehavior};

/// LoggingBehavior は request の開始・完了・失敗をログに出す
///
/// 内側の Behavior と Handler は `mediator.request` span の中で動く。
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBehavior;

impl LoggingBehavior {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for LoggingBehavior {
    async fn handle(
        &self,
        _request: &R,
        cancel: &CancellationToken,
        next: Next<'_, R>,
    ) -> HandlerResult<R::Response> {
        let span = debug_span!("mediator.request", request = type_name::<R>());
        let started = Instant::now();

        let result = async {
            debug!(cancelled = cancel.is_cancelled(), "handling request");
            next.run().await
        }
        .instrument(span.clone())
        .await;

        let elapsed_ms = millis(started.elapsed());
        span.in_scope(|| match &result {
            Ok(_) => debug!(elapsed_ms, "request handled"),
            Err(err) => warn!(elapsed_ms, error = %err, "request failed"),
        });
        result
    }
}

/// ログ用のミリ秒。u64 に収まらなければ u64::MAX
pub(crate) fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::{RequestHandler, chain};
    use std::sync::Arc;

    struct Square(i32);

    impl Request for Square {
        type Response = i32;
    }

    struct SquareHandler;

    #[async_trait]
    impl RequestHandler<Square> for SquareHandler {
        async fn handle(&self, request: &Square, _c: &CancellationToken) -> HandlerResult<i32> {
            if request.0 > 1000 {
                return Err("too large".into());
            }
            Ok(request.0 * request.0)
        }
    }

    #[test]
    fn millis_saturates_instead_of_wrapping() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn passes_response_through() {
        let behaviors: Vec<Arc<dyn PipelineBehavior<Square>>> = vec![Arc::new(LoggingBehavior)];
        let cancel = CancellationToken::new();

        let out = chain(&Square(12), &cancel, &behaviors, &SquareHandler)
            .run()
            .await
            .unwrap();
        assert_eq!(out, 144);
    }

    #[tokio::test]
    async fn passes_error_through() {
        let behaviors: Vec<Arc<dyn PipelineBehavior<Square>>> = vec![Arc::new(LoggingBehavior)];
        let cancel = CancellationToken::new();

        let err = chain(&Square(5000), &cancel, &behaviors, &SquareHandler)
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "too large");
    }
}
