//! Wrappers - 具体型ごとの呼び出し thunk
//!
//! # 学習ポイント
//! - Type erasure パターン (`RequestHandlerWrapper<R>` → `dyn RequestHandlerBase`)
//! - `as_any()` による型消去からの復元
//! - trait object に単相化された factory を持たせる（`AnyRequest::create_wrapper`）
//!
//! 1 つの wrapper が「Handler 解決 → Behavior 解決 → chain 構築 → 実行」を担当する。
//! wrapper は `DelegateCache` に型ごとに 1 つだけ作られ、以降は使い回される。

use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::{MediatorConfig, PublishStrategy};
use crate::domain::{
    AggregateError, BoxError, HandlerFailure, HandlerPanicked, HandlerResult, MediatorError,
    Notification, Request, RequestKey, TypeKey,
};
use crate::ports::HandlerRegistry;
use crate::typed::{NotificationHandler, PipelineBehavior, RequestHandler, chain};

mod sealed {
    pub trait Sealed {}
    impl<T: super::Request> Sealed for T {}
    pub trait SealedNotification {}
    impl<T: super::Notification> SealedNotification for T {}
}

/// RequestHandlerBase は object-safe な request thunk
///
/// `DelegateCache` に `Arc<dyn RequestHandlerBase>` として格納される。
#[async_trait]
pub trait RequestHandlerBase: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn key(&self) -> RequestKey;

    /// 型消去された request を処理し、型消去された response を返す
    async fn handle_erased(
        &self,
        request: Box<dyn AnyRequest>,
        registry: &dyn HandlerRegistry,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn Any + Send>, MediatorError>;
}

/// RequestHandlerWrapper は `R` 専用の thunk
pub struct RequestHandlerWrapper<R: Request> {
    key: RequestKey,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Request> RequestHandlerWrapper<R> {
    pub fn new() -> Self {
        Self {
            key: RequestKey::of::<R>(),
            _marker: PhantomData,
        }
    }

    /// # フロー
    /// 1. (R, R::Response) の Handler を 1 件解決（無ければ HandlerNotFound、Behavior は呼ばない）
    /// 2. Behavior を登録順に解決
    /// 3. chain を組み立てて一番外側から実行
    pub async fn handle(
        &self,
        request: &R,
        registry: &dyn HandlerRegistry,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let handler: Arc<dyn RequestHandler<R>> = registry
            .resolve_request_handler(self.key)
            .ok_or_else(|| MediatorError::handler_not_found(self.key))?
            .downcast()?;

        let behaviors = registry
            .resolve_behaviors(self.key)
            .iter()
            .map(|entry| entry.downcast::<Arc<dyn PipelineBehavior<R>>>())
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            request = self.key.request.name(),
            behaviors = behaviors.len(),
            "dispatching request"
        );

        chain(request, cancel, &behaviors, handler.as_ref())
            .run()
            .await
            .map_err(MediatorError::from_chain)
    }
}

impl<R: Request> Default for RequestHandlerWrapper<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Request> RequestHandlerBase for RequestHandlerWrapper<R> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key(&self) -> RequestKey {
        self.key
    }

    async fn handle_erased(
        &self,
        request: Box<dyn AnyRequest>,
        registry: &dyn HandlerRegistry,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn Any + Send>, MediatorError> {
        let actual = request.type_key().name();
        let request = request
            .into_any()
            .downcast::<R>()
            .map_err(|_| MediatorError::TypeMismatch {
                expected: self.key.request.name(),
                actual,
            })?;
        let response = self.handle(&request, registry, cancel).await?;
        Ok(Box::new(response))
    }
}

/// AnyRequest は実行時に型が決まる request
///
/// 全ての `Request` に自動で実装される（外部からは実装できない）。
/// `Box<dyn AnyRequest>` から具体型の wrapper を作れるのがポイント。
pub trait AnyRequest: sealed::Sealed + Send + Sync + 'static {
    fn type_key(&self) -> TypeKey;

    /// `R::Response` の識別子
    fn response_key(&self) -> TypeKey;

    fn create_wrapper(&self) -> Arc<dyn RequestHandlerBase>;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<R: Request> AnyRequest for R {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<R>()
    }

    fn response_key(&self) -> TypeKey {
        TypeKey::of::<R::Response>()
    }

    fn create_wrapper(&self) -> Arc<dyn RequestHandlerBase> {
        Arc::new(RequestHandlerWrapper::<R>::new())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// NotificationHandlerBase は object-safe な notification thunk
#[async_trait]
pub trait NotificationHandlerBase: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn key(&self) -> TypeKey;

    async fn handle_erased(
        &self,
        notification: Box<dyn AnyNotification>,
        registry: &dyn HandlerRegistry,
        config: &MediatorConfig,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError>;
}

/// NotificationHandlerWrapper は `N` 専用の thunk
pub struct NotificationHandlerWrapper<N: Notification> {
    key: TypeKey,
    _marker: PhantomData<fn() -> N>,
}

type NamedHandler<N> = (&'static str, Arc<dyn NotificationHandler<N>>);

impl<N: Notification> NotificationHandlerWrapper<N> {
    pub fn new() -> Self {
        Self {
            key: TypeKey::of::<N>(),
            _marker: PhantomData,
        }
    }

    /// # フロー
    /// 1. N の Handler を全件解決
    /// 2. 0 件なら設定次第で NoHandlersRegistered / 何もせず成功
    /// 3. 全 Handler を実行し、全件の完了を待つ
    /// 4. 失敗した Handler を全て AggregateError にまとめる
    pub async fn handle(
        &self,
        notification: Arc<N>,
        registry: &dyn HandlerRegistry,
        config: &MediatorConfig,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let entries = registry.resolve_notification_handlers(self.key);
        if entries.is_empty() {
            if config.require_notification_handler {
                return Err(MediatorError::NoHandlersRegistered {
                    notification: self.key,
                });
            }
            debug!(notification = self.key.name(), "no handlers registered, skipping");
            return Ok(());
        }

        let handlers = entries
            .iter()
            .map(|entry| Ok((entry.name(), entry.downcast::<Arc<dyn NotificationHandler<N>>>()?)))
            .collect::<Result<Vec<NamedHandler<N>>, MediatorError>>()?;

        debug!(
            notification = self.key.name(),
            handlers = handlers.len(),
            strategy = ?config.publish_strategy,
            "publishing notification"
        );

        let failures = match config.publish_strategy {
            PublishStrategy::Parallel => publish_parallel(handlers, notification, cancel).await,
            PublishStrategy::Sequential => publish_sequential(handlers, &notification, cancel).await,
        };

        if failures.is_empty() {
            return Ok(());
        }
        for failure in &failures {
            warn!(
                notification = self.key.name(),
                handler = failure.handler,
                error = %failure.error,
                "notification handler failed"
            );
        }
        Err(AggregateError::new(self.key, failures).into())
    }
}

impl<N: Notification> Default for NotificationHandlerWrapper<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler を 1 件実行する。panic は `HandlerPanicked` としてその Handler の失敗になる
async fn invoke<N: Notification>(
    handler: &dyn NotificationHandler<N>,
    notification: &N,
    cancel: &CancellationToken,
) -> HandlerResult<()> {
    AssertUnwindSafe(handler.handle(notification, cancel))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Box::new(HandlerPanicked::from_payload(payload)) as BoxError))
}

/// 全 Handler を起動してから待つ
///
/// tokio runtime 上なら spawn（本当に並列）。runtime が無ければ同一タスク内で
/// 全 future を同時に poll する。
async fn publish_parallel<N: Notification>(
    handlers: Vec<NamedHandler<N>>,
    notification: Arc<N>,
    cancel: &CancellationToken,
) -> Vec<HandlerFailure> {
    if tokio::runtime::Handle::try_current().is_err() {
        let results = join_all(
            handlers
                .iter()
                .map(|(_, handler)| invoke(handler.as_ref(), &*notification, cancel)),
        )
        .await;
        return collect_failures(handlers.iter().map(|(name, _)| *name).zip(results));
    }

    let names: Vec<&'static str> = handlers.iter().map(|(name, _)| *name).collect();
    let joins: Vec<_> = handlers
        .into_iter()
        .map(|(_, handler)| {
            let notification = Arc::clone(&notification);
            let cancel = cancel.clone();
            tokio::spawn(async move { invoke(handler.as_ref(), &*notification, &cancel).await })
        })
        .collect();

    let results = join_all(joins).await.into_iter().map(|joined| match joined {
        Ok(result) => result,
        // runtime の shutdown で中断された場合
        Err(join_error) => Err(Box::new(join_error) as BoxError),
    });
    collect_failures(names.into_iter().zip(results))
}

/// 登録順に 1 件ずつ実行する。途中で失敗しても最後まで実行する
async fn publish_sequential<N: Notification>(
    handlers: Vec<NamedHandler<N>>,
    notification: &N,
    cancel: &CancellationToken,
) -> Vec<HandlerFailure> {
    let mut results = Vec::with_capacity(handlers.len());
    for (name, handler) in &handlers {
        results.push((*name, invoke(handler.as_ref(), notification, cancel).await));
    }
    collect_failures(results)
}

fn collect_failures(
    results: impl IntoIterator<Item = (&'static str, Result<(), BoxError>)>,
) -> Vec<HandlerFailure> {
    results
        .into_iter()
        .enumerate()
        .filter_map(|(index, (handler, result))| {
            result.err().map(|error| HandlerFailure {
                index,
                handler,
                error,
            })
        })
        .collect()
}

#[async_trait]
impl<N: Notification> NotificationHandlerBase for NotificationHandlerWrapper<N> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key(&self) -> TypeKey {
        self.key
    }

    async fn handle_erased(
        &self,
        notification: Box<dyn AnyNotification>,
        registry: &dyn HandlerRegistry,
        config: &MediatorConfig,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let actual = notification.type_key().name();
        let notification = notification
            .into_any()
            .downcast::<N>()
            .map_err(|_| MediatorError::TypeMismatch {
                expected: self.key.name(),
                actual,
            })?;
        self.handle(Arc::from(notification), registry, config, cancel)
            .await
    }
}

/// AnyNotification は実行時に型が決まる notification
pub trait AnyNotification: sealed::SealedNotification + Send + Sync + 'static {
    fn type_key(&self) -> TypeKey;

    fn create_wrapper(&self) -> Arc<dyn NotificationHandlerBase>;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<N: Notification> AnyNotification for N {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<N>()
    }

    fn create_wrapper(&self) -> Arc<dyn NotificationHandlerBase> {
        Arc::new(NotificationHandlerWrapper::<N>::new())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// キャッシュから取り出した thunk を具体型に戻す
pub(crate) fn downcast_wrapper<'a, W: 'static>(
    any: &'a dyn Any,
    expected: TypeKey,
) -> Result<&'a W, MediatorError> {
    any.downcast_ref::<W>()
        .ok_or_else(|| MediatorError::TypeMismatch {
            expected: expected.name(),
            actual: type_name::<W>(),
        })
}
