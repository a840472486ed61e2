//! MediatorBuilder - Mediator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use crate::app::config::MediatorConfig;
use crate::app::mediator::Mediator;
use crate::domain::{Notification, Request, RequestKey};
use crate::typed::{NotificationHandler, PipelineBehavior, RegistryError, RequestHandler, TypedRegistry};

/// MediatorBuilder は Mediator を構築
///
/// # 使用例
/// ```ignore
/// let mediator = MediatorBuilder::new()
///     .request::<Echo, _>(EchoHandler)?
///     .behavior::<Echo, _>(LoggingBehavior::new())
///     .notification::<Ping, _>(PingHandler)
///     .expect_request::<Echo>()
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_request() で Handler が必須の request 型を宣言
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す（send 時の HandlerNotFound を起動時に前倒し）
pub struct MediatorBuilder {
    registry: TypedRegistry,
    config: MediatorConfig,
    expected: Vec<RequestKey>,
}

/// BuildError は Mediator 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing request handlers: {0:?}. These requests were expected but not registered.")]
    MissingHandlers(Vec<String>),
}

impl MediatorBuilder {
    /// 新しい MediatorBuilder を作成
    pub fn new() -> Self {
        Self {
            registry: TypedRegistry::new(),
            config: MediatorConfig::default(),
            expected: Vec::new(),
        }
    }

    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Request handler を登録（同じ型の二重登録はエラー）
    pub fn request<R: Request, H: RequestHandler<R> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register_request::<R, H>(handler)?;
        Ok(self)
    }

    pub fn notification<N: Notification, H: NotificationHandler<N> + 'static>(
        mut self,
        handler: H,
    ) -> Self {
        self.registry.register_notification::<N, H>(handler);
        self
    }

    /// Behavior を登録。先に登録したものが外側になる
    pub fn behavior<R: Request, B: PipelineBehavior<R> + 'static>(mut self, behavior: B) -> Self {
        self.registry.register_behavior::<R, B>(behavior);
        self
    }

    pub fn expect_request<R: Request>(mut self) -> Self {
        self.expected.push(RequestKey::of::<R>());
        self
    }

    /// # 検証
    /// - expect_request() で宣言された request 型が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingHandlers を返す
    pub fn build(self) -> Result<Mediator, BuildError> {
        let missing: Vec<String> = self
            .expected
            .iter()
            .filter(|key| !self.registry.contains_request_key(key))
            .map(|key| key.request.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingHandlers(missing));
        }
        Ok(Mediator::with_config(self.registry, self.config))
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
