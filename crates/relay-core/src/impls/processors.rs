//! Processor behaviors - pre / post processor を chain に組み込む
//!
//! # 実行順
//! - `PreProcessorBehavior`: 登録順に全 pre processor → next
//! - `PostProcessorBehavior`: next → 成功時のみ登録順に全 post processor
//!
//! processor がエラーを返したらそこで止まり、そのエラーが呼び出し側に返る。

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{HandlerResult, Request};
use crate::typed::{Next, PipelineBehavior, RequestPostProcessor, RequestPreProcessor};

pub struct PreProcessorBehavior<R: Request> {
    processors: Vec<Arc<dyn RequestPreProcessor<R>>>,
}

impl<R: Request> PreProcessorBehavior<R> {
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    pub fn with(mut self, processor: impl RequestPreProcessor<R> + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl<R: Request> Default for PreProcessorBehavior<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for PreProcessorBehavior<R> {
    async fn handle(
        &self,
        request: &R,
        cancel: &CancellationToken,
        next: Next<'_, R>,
    ) -> HandlerResult<R::Response> {
        for processor in &self.processors {
            processor.process(request, cancel).await?;
        }
        next.run().await
    }
}

pub struct PostProcessorBehavior<R: Request> {
    processors: Vec<Arc<dyn RequestPostProcessor<R>>>,
}

impl<R: Request> PostProcessorBehavior<R> {
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    pub fn with(mut self, processor: impl RequestPostProcessor<R> + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl<R: Request> Default for PostProcessorBehavior<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for PostProcessorBehavior<R> {
    async fn handle(
        &self,
        request: &R,
        cancel: &CancellationToken,
        next: Next<'_, R>,
    ) -> HandlerResult<R::Response> {
        let response = next.run().await?;
        for processor in &self.processors {
            processor.process(request, &response, cancel).await?;
        }
        Ok(response)
    }
}
