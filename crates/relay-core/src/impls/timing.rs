//! TimingBehavior - 遅い request を検出する

use std::any::type_name;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::logging::millis;
use crate::domain::{HandlerResult, Request};
use crate::typed::{Next, PipelineBehavior};

/// TimingBehavior は内側の処理時間が閾値を超えたら warn を出す
///
/// 結果（成功・失敗）は変更しない。閾値超えの回数は `slow_requests()` で見られる。
#[derive(Debug)]
pub struct TimingBehavior {
    threshold: Duration,
    slow: AtomicU64,
}

impl TimingBehavior {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            slow: AtomicU64::new(0),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn slow_requests(&self) -> u64 {
        self.slow.load(Ordering::Relaxed)
    }
}

impl Default for TimingBehavior {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for TimingBehavior {
    async fn handle(
        &self,
        _request: &R,
        _cancel: &CancellationToken,
        next: Next<'_, R>,
    ) -> HandlerResult<R::Response> {
        let started = Instant::now();
        let result = next.run().await;
        let elapsed = started.elapsed();

        if elapsed > self.threshold {
            self.slow.fetch_add(1, Ordering::Relaxed);
            warn!(
                request = type_name::<R>(),
                elapsed_ms = millis(elapsed),
                threshold_ms = millis(self.threshold),
                "slow request"
            );
        }
        result
    }
}
