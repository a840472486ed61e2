//! Mediator - send / publish の入り口
//!
//! # 学習ポイント
//! - `DelegateCache` による型ごとの thunk の再利用
//! - 型付き API と型消去 API（`send_dyn` / `publish_dyn`）が同じ thunk を共有する
//!
//! Mediator 自身は呼び出しごとの可変状態を持たない。共有される可変状態は
//! 2 つの `DelegateCache` だけ。

use std::any::{Any, type_name};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::cache::DelegateCache;
use super::config::MediatorConfig;
use super::wrapper::{
    AnyNotification, AnyRequest, NotificationHandlerBase, NotificationHandlerWrapper,
    RequestHandlerBase, RequestHandlerWrapper, downcast_wrapper,
};
use crate::domain::{MediatorError, Notification, Request, TypeKey};
use crate::ports::HandlerRegistry;

/// Mediator は Request を 1 つの Handler に、Notification を全 Handler に届ける
///
/// # 使用例
/// ```ignore
/// let mediator = Mediator::new(registry);
/// let doubled = mediator.send(Echo { value: 5 }).await?;
/// mediator.publish(Ping).await?;
/// ```
///
/// # 失敗
/// Handler / Behavior のエラーは `MediatorError::Handler` としてそのまま返す。
/// リトライ・フォールバックは行わない（必要なら Behavior で書く）。
pub struct Mediator {
    registry: Arc<dyn HandlerRegistry>,
    config: MediatorConfig,
    request_wrappers: DelegateCache<Arc<dyn RequestHandlerBase>>,
    notification_wrappers: DelegateCache<Arc<dyn NotificationHandlerBase>>,
}

impl Mediator {
    pub fn new(registry: impl HandlerRegistry + 'static) -> Self {
        Self::with_config(registry, MediatorConfig::default())
    }

    pub fn with_config(registry: impl HandlerRegistry + 'static, config: MediatorConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            request_wrappers: DelegateCache::new(),
            notification_wrappers: DelegateCache::new(),
        }
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &dyn HandlerRegistry {
        self.registry.as_ref()
    }

    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response, MediatorError> {
        self.send_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// `cancel` は全ての Behavior と Handler に渡される。Mediator 自身は見ない
    pub async fn send_with_cancellation<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let key = TypeKey::of::<R>();
        let base = self.request_wrappers.get_or_create(key, || {
            Arc::new(RequestHandlerWrapper::<R>::new()) as Arc<dyn RequestHandlerBase>
        });
        let wrapper = downcast_wrapper::<RequestHandlerWrapper<R>>(base.as_any(), key)?;
        wrapper.handle(&request, self.registry.as_ref(), cancel).await
    }

    /// 実行時に型が決まる request を送る
    ///
    /// `None` は `NullRequest`。戻り値は `R::Response` に downcast できる。
    pub async fn send_dyn(
        &self,
        request: Option<Box<dyn AnyRequest>>,
    ) -> Result<Box<dyn Any + Send>, MediatorError> {
        self.send_dyn_with_cancellation(request, &CancellationToken::new())
            .await
    }

    pub async fn send_dyn_with_cancellation(
        &self,
        request: Option<Box<dyn AnyRequest>>,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn Any + Send>, MediatorError> {
        let request = request.ok_or(MediatorError::NullRequest)?;
        let wrapper = self
            .request_wrappers
            .get_or_create(request.type_key(), || request.create_wrapper());
        wrapper
            .handle_erased(request, self.registry.as_ref(), cancel)
            .await
    }

    /// `send_dyn` の結果を `T` に戻す
    pub async fn send_dyn_as<T: 'static>(
        &self,
        request: Option<Box<dyn AnyRequest>>,
    ) -> Result<T, MediatorError> {
        let actual = request.as_ref().map(|request| request.response_key().name());
        let response = self.send_dyn(request).await?;
        response
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| MediatorError::TypeMismatch {
                expected: type_name::<T>(),
                actual: actual.unwrap_or(type_name::<()>()),
            })
    }

    pub async fn publish<N: Notification>(&self, notification: N) -> Result<(), MediatorError> {
        self.publish_with_cancellation(notification, &CancellationToken::new())
            .await
    }

    /// 全 Handler の完了を待ってから返る
    ///
    /// 並列実行中に呼び出し側がこの future を drop しても、spawn 済みの Handler は最後まで走る。
    pub async fn publish_with_cancellation<N: Notification>(
        &self,
        notification: N,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let key = TypeKey::of::<N>();
        let base = self.notification_wrappers.get_or_create(key, || {
            Arc::new(NotificationHandlerWrapper::<N>::new()) as Arc<dyn NotificationHandlerBase>
        });
        let wrapper = downcast_wrapper::<NotificationHandlerWrapper<N>>(base.as_any(), key)?;
        wrapper
            .handle(
                Arc::new(notification),
                self.registry.as_ref(),
                &self.config,
                cancel,
            )
            .await
    }

    /// 実行時に型が決まる notification を publish する。`None` は `NullNotification`
    pub async fn publish_dyn(
        &self,
        notification: Option<Box<dyn AnyNotification>>,
    ) -> Result<(), MediatorError> {
        self.publish_dyn_with_cancellation(notification, &CancellationToken::new())
            .await
    }

    pub async fn publish_dyn_with_cancellation(
        &self,
        notification: Option<Box<dyn AnyNotification>>,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let notification = notification.ok_or(MediatorError::NullNotification)?;
        let wrapper = self
            .notification_wrappers
            .get_or_create(notification.type_key(), || notification.create_wrapper());
        wrapper
            .handle_erased(
                notification,
                self.registry.as_ref(),
                &self.config,
                cancel,
            )
            .await
    }

    /// thunk がキャッシュ済みの request 型の数
    pub fn cached_request_types(&self) -> usize {
        self.request_wrappers.len()
    }

    pub fn cached_notification_types(&self) -> usize {
        self.notification_wrappers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::PublishStrategy;
    use crate::domain::{HandlerPanicked, HandlerResult, Unit};
    use crate::typed::{Next, NotificationHandler, PipelineBehavior, RequestHandler, TypedRegistry};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    // ── requests ────────────────────────────────────────────────────────────

    struct Echo {
        value: i64,
    }

    impl Request for Echo {
        type Response = i64;
    }

    struct Forget;

    impl Request for Forget {
        type Response = Unit;
    }

    struct Cancellable;

    impl Request for Cancellable {
        type Response = bool;
    }

    #[derive(Debug, thiserror::Error)]
    #[error("echo rejected {0}")]
    struct Rejected(i64);

    struct EchoHandler {
        calls: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RequestHandler<Echo> for EchoHandler {
        async fn handle(&self, request: &Echo, _cancel: &CancellationToken) -> HandlerResult<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push("handler".to_string());
            if request.value < 0 {
                return Err(Box::new(Rejected(request.value)));
            }
            Ok(request.value * 2)
        }
    }

    struct ForgetHandler;

    #[async_trait]
    impl RequestHandler<Forget> for ForgetHandler {
        async fn handle(&self, _r: &Forget, _c: &CancellationToken) -> HandlerResult<Unit> {
            Ok(Unit)
        }
    }

    struct CancellableHandler;

    #[async_trait]
    impl RequestHandler<Cancellable> for CancellableHandler {
        async fn handle(&self, _r: &Cancellable, cancel: &CancellationToken) -> HandlerResult<bool> {
            Ok(cancel.is_cancelled())
        }
    }

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PipelineBehavior<Echo> for Probe {
        async fn handle(
            &self,
            _request: &Echo,
            _cancel: &CancellationToken,
            next: Next<'_, Echo>,
        ) -> HandlerResult<i64> {
            self.log.lock().unwrap().push(format!("{}:pre", self.name));
            let out = next.run().await;
            self.log.lock().unwrap().push(format!("{}:post", self.name));
            out
        }
    }

    struct Cached(i64);

    #[async_trait]
    impl PipelineBehavior<Echo> for Cached {
        async fn handle(
            &self,
            _request: &Echo,
            _cancel: &CancellationToken,
            _next: Next<'_, Echo>,
        ) -> HandlerResult<i64> {
            Ok(self.0)
        }
    }

    struct Failing;

    #[async_trait]
    impl PipelineBehavior<Echo> for Failing {
        async fn handle(
            &self,
            request: &Echo,
            _cancel: &CancellationToken,
            _next: Next<'_, Echo>,
        ) -> HandlerResult<i64> {
            Err(Box::new(Rejected(request.value)))
        }
    }

    struct Fixture {
        calls: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
        registry: TypedRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let calls = Arc::new(AtomicUsize::new(0));
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut registry = TypedRegistry::new();
            registry
                .register_request::<Echo, _>(EchoHandler {
                    calls: calls.clone(),
                    log: log.clone(),
                })
                .unwrap();
            Self {
                calls,
                log,
                registry,
            }
        }

        fn probe(&mut self, name: &'static str) -> &mut Self {
            self.registry.register_behavior::<Echo, _>(Probe {
                name,
                log: self.log.clone(),
            });
            self
        }
    }

    // ── send ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn send_echo_doubles_value() {
        let fixture = Fixture::new();
        let calls = fixture.calls.clone();
        let mediator = Mediator::new(fixture.registry);

        assert_eq!(mediator.send(Echo { value: 5 }).await.unwrap(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_unit_command() {
        let mut registry = TypedRegistry::new();
        registry.register_request::<Forget, _>(ForgetHandler).unwrap();
        let mediator = Mediator::new(registry);

        assert_eq!(mediator.send(Forget).await.unwrap(), Unit);
    }

    #[tokio::test]
    async fn behaviors_run_as_onion() {
        let mut fixture = Fixture::new();
        fixture.probe("first").probe("second").probe("third");
        let log = fixture.log.clone();
        let mediator = Mediator::new(fixture.registry);

        assert_eq!(mediator.send(Echo { value: 1 }).await.unwrap(), 2);
        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                "first:pre",
                "second:pre",
                "third:pre",
                "handler",
                "third:post",
                "second:post",
                "first:post",
            ]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_handler_and_inner_behaviors() {
        let mut fixture = Fixture::new();
        fixture.probe("outer");
        fixture.registry.register_behavior::<Echo, _>(Cached(7));
        fixture.probe("inner");
        let mediator = Mediator::new(Arc::new(fixture.registry));

        assert_eq!(mediator.send(Echo { value: 100 }).await.unwrap(), 7);
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            fixture.log.lock().unwrap().clone(),
            vec!["outer:pre", "outer:post"]
        );
    }

    #[tokio::test]
    async fn missing_handler_never_invokes_behaviors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TypedRegistry::new();
        registry.register_behavior::<Echo, _>(Probe {
            name: "orphan",
            log: log.clone(),
        });
        let mediator = Mediator::new(registry);

        let err = mediator.send(Echo { value: 1 }).await.unwrap_err();

        assert!(matches!(
            err,
            MediatorError::HandlerNotFound { request, .. } if request == TypeKey::of::<Echo>()
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handler_error_reaches_caller_unchanged() {
        let mut fixture = Fixture::new();
        fixture.probe("outer");
        let log_probe = fixture.log.clone();
        let mediator = Mediator::new(fixture.registry);

        let err = mediator.send(Echo { value: -3 }).await.unwrap_err();

        assert_eq!(err.downcast_ref::<Rejected>().map(|r| r.0), Some(-3));
        assert_eq!(err.to_string(), "echo rejected -3");
        // 外側の Behavior の後処理は失敗時も走る
        assert_eq!(
            log_probe.lock().unwrap().clone(),
            vec!["outer:pre", "handler", "outer:post"]
        );
    }

    #[tokio::test]
    async fn behavior_error_reaches_caller_unchanged() {
        let mut fixture = Fixture::new();
        fixture.registry.register_behavior::<Echo, _>(Failing);
        let calls = fixture.calls.clone();
        let mediator = Mediator::new(fixture.registry);

        let err = mediator.send(Echo { value: 9 }).await.unwrap_err();

        assert_eq!(err.downcast_ref::<Rejected>().map(|r| r.0), Some(9));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[case::fresh(false)]
    #[case::cancelled(true)]
    #[tokio::test]
    async fn cancellation_token_is_forwarded(#[case] cancelled: bool) {
        let mut registry = TypedRegistry::new();
        registry
            .register_request::<Cancellable, _>(CancellableHandler)
            .unwrap();
        let mediator = Mediator::new(registry);
        let token = CancellationToken::new();
        if cancelled {
            token.cancel();
        }

        let seen = mediator
            .send_with_cancellation(Cancellable, &token)
            .await
            .unwrap();
        assert_eq!(seen, cancelled);
    }

    #[tokio::test]
    async fn repeated_sends_reuse_one_thunk() {
        let fixture = Fixture::new();
        let calls = fixture.calls.clone();
        let mediator = Mediator::new(fixture.registry);
        assert_eq!(mediator.cached_request_types(), 0);

        for value in 0..20 {
            assert_eq!(mediator.send(Echo { value }).await.unwrap(), value * 2);
        }

        assert_eq!(mediator.cached_request_types(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_share_one_thunk() {
        let fixture = Fixture::new();
        let mediator = Arc::new(Mediator::new(fixture.registry));

        let joins: Vec<_> = (0..32)
            .map(|value| {
                let mediator = Arc::clone(&mediator);
                tokio::spawn(async move { mediator.send(Echo { value }).await.unwrap() })
            })
            .collect();
        for (value, join) in joins.into_iter().enumerate() {
            assert_eq!(join.await.unwrap(), value as i64 * 2);
        }

        assert_eq!(mediator.cached_request_types(), 1);
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 32);
    }

    // ── send_dyn ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn send_dyn_rejects_null() {
        let mediator = Mediator::new(TypedRegistry::new());
        let err = mediator.send_dyn(None).await.unwrap_err();
        assert!(matches!(err, MediatorError::NullRequest));
    }

    #[tokio::test]
    async fn send_dyn_resolves_runtime_type() {
        let fixture = Fixture::new();
        let mediator = Mediator::new(fixture.registry);

        let response = mediator
            .send_dyn(Some(Box::new(Echo { value: 4 })))
            .await
            .unwrap();
        assert_eq!(response.downcast_ref::<i64>(), Some(&8));

        let typed: i64 = mediator
            .send_dyn_as(Some(Box::new(Echo { value: 6 })))
            .await
            .unwrap();
        assert_eq!(typed, 12);

        // 型付き API と dynamic API は同じ thunk を使う
        assert_eq!(mediator.send(Echo { value: 1 }).await.unwrap(), 2);
        assert_eq!(mediator.cached_request_types(), 1);
    }

    #[tokio::test]
    async fn send_dyn_as_reports_wrong_response_type() {
        let fixture = Fixture::new();
        let mediator = Mediator::new(fixture.registry);

        let err = mediator
            .send_dyn_as::<String>(Some(Box::new(Echo { value: 1 })))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MediatorError::TypeMismatch { expected, actual }
                if expected == type_name::<String>() && actual == "i64"
        ));
    }

    #[tokio::test]
    async fn send_dyn_without_handler_fails() {
        let mediator = Mediator::new(TypedRegistry::new());
        let err = mediator
            .send_dyn(Some(Box::new(Forget)))
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::HandlerNotFound { .. }));
    }

    // ── notifications ───────────────────────────────────────────────────────

    struct Ping;
    impl Notification for Ping {}

    struct SetFlag(Arc<AtomicBool>);

    #[async_trait]
    impl NotificationHandler<Ping> for SetFlag {
        async fn handle(&self, _n: &Ping, _c: &CancellationToken) -> HandlerResult<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Boom(&'static str);

    #[async_trait]
    impl NotificationHandler<Ping> for Boom {
        async fn handle(&self, _n: &Ping, _c: &CancellationToken) -> HandlerResult<()> {
            Err(self.0.into())
        }
    }

    struct Named {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationHandler<Ping> for Named {
        async fn handle(&self, _n: &Ping, _c: &CancellationToken) -> HandlerResult<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(format!("{} failed", self.name).into());
            }
            Ok(())
        }
    }

    struct Slow {
        delay: Duration,
        done: Arc<AtomicBool>,
    }

    #[async_trait]
    impl NotificationHandler<Ping> for Slow {
        async fn handle(&self, _n: &Ping, _c: &CancellationToken) -> HandlerResult<()> {
            tokio::time::sleep(self.delay).await;
            self.done.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Rendezvous(Arc<tokio::sync::Barrier>);

    #[async_trait]
    impl NotificationHandler<Ping> for Rendezvous {
        async fn handle(&self, _n: &Ping, _c: &CancellationToken) -> HandlerResult<()> {
            self.0.wait().await;
            Ok(())
        }
    }

    struct Panics;

    #[async_trait]
    impl NotificationHandler<Ping> for Panics {
        async fn handle(&self, _n: &Ping, _c: &CancellationToken) -> HandlerResult<()> {
            panic!("handler panicked");
        }
    }

    #[tokio::test]
    async fn ping_reaches_every_handler() {
        let a = Arc::new(AtomicBool::new(false));
        let b = Arc::new(AtomicBool::new(false));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(SetFlag(a.clone()));
        registry.register_notification::<Ping, _>(SetFlag(b.clone()));
        let mediator = Mediator::new(registry);

        mediator.publish(Ping).await.unwrap();

        assert!(a.load(Ordering::SeqCst));
        assert!(b.load(Ordering::SeqCst));
    }

    #[rstest]
    #[case::lenient(false)]
    #[case::strict(true)]
    #[tokio::test]
    async fn publish_without_handlers(#[case] require: bool) {
        let config = MediatorConfig::default().with_require_notification_handler(require);
        let mediator = Mediator::with_config(TypedRegistry::new(), config);

        let result = mediator.publish(Ping).await;

        if require {
            assert!(matches!(
                result,
                Err(MediatorError::NoHandlersRegistered { notification }) if notification == TypeKey::of::<Ping>()
            ));
        } else {
            assert!(result.is_ok());
        }
    }

    #[rstest]
    #[case::parallel(PublishStrategy::Parallel)]
    #[case::sequential(PublishStrategy::Sequential)]
    #[tokio::test]
    async fn publish_reports_every_failing_handler(#[case] strategy: PublishStrategy) {
        let ok = Arc::new(AtomicBool::new(false));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(Boom("first"));
        registry.register_notification::<Ping, _>(SetFlag(ok.clone()));
        registry.register_notification::<Ping, _>(Boom("third"));
        let config = MediatorConfig::default().with_publish_strategy(strategy);
        let mediator = Mediator::with_config(registry, config);

        let err = mediator.publish(Ping).await.unwrap_err();

        assert!(ok.load(Ordering::SeqCst));
        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 0);
        assert_eq!(failures[0].error.to_string(), "first");
        assert!(failures[0].handler.ends_with("Boom"));
        assert_eq!(failures[1].index, 2);
        assert_eq!(failures[1].error.to_string(), "third");
    }

    #[tokio::test]
    async fn publish_waits_for_slow_handlers_before_failing() {
        let done = Arc::new(AtomicBool::new(false));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(Boom("fast"));
        registry.register_notification::<Ping, _>(Slow {
            delay: Duration::from_millis(50),
            done: done.clone(),
        });
        let mediator = Mediator::new(registry);

        let err = mediator.publish(Ping).await.unwrap_err();

        assert_eq!(err.failures().len(), 1);
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn parallel_publish_runs_handlers_concurrently() {
        // 逐次実行なら 1 件目が barrier で待ち続ける
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(Rendezvous(barrier.clone()));
        registry.register_notification::<Ping, _>(Rendezvous(barrier.clone()));
        let mediator = Mediator::new(registry);

        let result = tokio::time::timeout(Duration::from_secs(5), mediator.publish(Ping)).await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn sequential_publish_keeps_order_and_continues_after_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TypedRegistry::new();
        for (name, fail) in [("a", true), ("b", false), ("c", false)] {
            registry.register_notification::<Ping, _>(Named {
                name,
                log: log.clone(),
                fail,
            });
        }
        let config = MediatorConfig::default().with_publish_strategy(PublishStrategy::Sequential);
        let mediator = Mediator::with_config(registry, config);

        let err = mediator.publish(Ping).await.unwrap_err();

        assert_eq!(log.lock().unwrap().clone(), vec!["a", "b", "c"]);
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].error.to_string(), "a failed");
    }

    #[rstest]
    #[case::parallel(PublishStrategy::Parallel)]
    #[case::sequential(PublishStrategy::Sequential)]
    #[tokio::test]
    async fn panicking_handler_is_reported_as_failure(#[case] strategy: PublishStrategy) {
        let ok = Arc::new(AtomicBool::new(false));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(Panics);
        registry.register_notification::<Ping, _>(Boom("after panic"));
        registry.register_notification::<Ping, _>(SetFlag(ok.clone()));
        let config = MediatorConfig::default().with_publish_strategy(strategy);
        let mediator = Mediator::with_config(registry, config);

        let err = mediator.publish(Ping).await.unwrap_err();

        // panic の後に登録された Handler も実行される
        assert!(ok.load(Ordering::SeqCst));
        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].handler.ends_with("Panics"));
        assert_eq!(
            failures[0]
                .error
                .downcast_ref::<HandlerPanicked>()
                .map(|p| p.message.as_str()),
            Some("handler panicked")
        );
        assert_eq!(failures[1].index, 1);
        assert_eq!(failures[1].error.to_string(), "after panic");
    }

    #[test]
    fn parallel_publish_without_tokio_runtime() {
        let a = Arc::new(AtomicBool::new(false));
        let b = Arc::new(AtomicBool::new(false));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(SetFlag(a.clone()));
        registry.register_notification::<Ping, _>(Panics);
        registry.register_notification::<Ping, _>(Boom("plain failure"));
        registry.register_notification::<Ping, _>(SetFlag(b.clone()));
        let mediator = Mediator::new(registry);
        assert_eq!(mediator.config().publish_strategy, PublishStrategy::Parallel);

        let err = futures::executor::block_on(mediator.publish(Ping)).unwrap_err();

        assert!(a.load(Ordering::SeqCst));
        assert!(b.load(Ordering::SeqCst));
        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert!(failures[0].error.downcast_ref::<HandlerPanicked>().is_some());
        assert_eq!(failures[1].index, 2);
        assert_eq!(failures[1].error.to_string(), "plain failure");
    }

    #[tokio::test]
    async fn publish_dyn_rejects_null_and_dispatches_runtime_type() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut registry = TypedRegistry::new();
        registry.register_notification::<Ping, _>(SetFlag(flag.clone()));
        let mediator = Mediator::new(registry);

        let err = mediator.publish_dyn(None).await.unwrap_err();
        assert!(matches!(err, MediatorError::NullNotification));

        mediator.publish_dyn(Some(Box::new(Ping))).await.unwrap();
        assert!(flag.load(Ordering::SeqCst));

        mediator.publish(Ping).await.unwrap();
        assert_eq!(mediator.cached_notification_types(), 1);
        assert_eq!(mediator.cached_request_types(), 0);
    }
}
