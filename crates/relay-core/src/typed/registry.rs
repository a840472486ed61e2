//! TypedRegistry - Handler / Behavior の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性（`TypeId` がキー）
//! - Arc による共有所有権
//!
//! `HandlerRegistry` port のインメモリ実装。初期化時に `&mut` で組み立て、
//! 実行時は読み取り専用で共有する（ロック不要）。

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{NotificationHandler, RequestHandler};
use super::pipeline::PipelineBehavior;
use crate::domain::{Notification, Request, RequestKey, TypeKey};
use crate::ports::{HandlerRegistry, ServiceEntry};

/// TypedRegistry は型付き Handler / Behavior を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = TypedRegistry::new();
/// registry.register_request::<Echo, _>(EchoHandler)?;
/// registry.register_notification::<Ping, _>(AuditHandler);
/// registry.register_behavior::<Echo, _>(LoggingBehavior::new());
/// ```
///
/// # 多重度
/// - request handler: (request, response) ごとに 1 件。二重登録はエラー
/// - notification handler: 0..N 件、登録順
/// - behavior: 0..N 件、登録順（先に登録したものが外側）
#[derive(Default)]
pub struct TypedRegistry {
    request_handlers: HashMap<RequestKey, ServiceEntry>,
    notification_handlers: HashMap<TypeKey, Vec<ServiceEntry>>,
    behaviors: HashMap<RequestKey, Vec<ServiceEntry>>,
}

/// RegistryError は TypedRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for request type '{0}' is already registered")]
    AlreadyRegistered(&'static str),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_request<R: Request, H: RequestHandler<R> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let key = RequestKey::of::<R>();
        if self.request_handlers.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key.request.name()));
        }
        let handler: Arc<dyn RequestHandler<R>> = Arc::new(handler);
        self.request_handlers
            .insert(key, ServiceEntry::request_handler(type_name::<H>(), handler));
        Ok(())
    }

    pub fn register_notification<N: Notification, H: NotificationHandler<N> + 'static>(
        &mut self,
        handler: H,
    ) {
        let handler: Arc<dyn NotificationHandler<N>> = Arc::new(handler);
        self.notification_handlers
            .entry(TypeKey::of::<N>())
            .or_default()
            .push(ServiceEntry::notification_handler(type_name::<H>(), handler));
    }

    pub fn register_behavior<R: Request, B: PipelineBehavior<R> + 'static>(&mut self, behavior: B) {
        let behavior: Arc<dyn PipelineBehavior<R>> = Arc::new(behavior);
        self.behaviors
            .entry(RequestKey::of::<R>())
            .or_default()
            .push(ServiceEntry::behavior(type_name::<B>(), behavior));
    }

    pub fn contains_request<R: Request>(&self) -> bool {
        self.request_handlers.contains_key(&RequestKey::of::<R>())
    }

    /// Handler が登録されている request 型の名前
    pub fn registered_requests(&self) -> Vec<&'static str> {
        self.request_handlers
            .keys()
            .map(|key| key.request.name())
            .collect()
    }

    pub(crate) fn contains_request_key(&self, key: &RequestKey) -> bool {
        self.request_handlers.contains_key(key)
    }
}

impl HandlerRegistry for TypedRegistry {
    fn resolve_request_handler(&self, key: RequestKey) -> Option<ServiceEntry> {
        self.request_handlers.get(&key).cloned()
    }

    fn resolve_notification_handlers(&self, notification: TypeKey) -> Vec<ServiceEntry> {
        self.notification_handlers
            .get(&notification)
            .cloned()
            .unwrap_or_default()
    }

    fn resolve_behaviors(&self, key: RequestKey) -> Vec<ServiceEntry> {
        self.behaviors.get(&key).cloned().unwrap_or_default()
    }
}
