//! HandlerRegistry port - 型から Handler / Behavior を引く
//!
//! DI コンテナなど外部の仕組みをこの trait の裏に置く。Mediator は問い合わせるだけで、
//! 登録も変更もしない。
//!
//! # 型消去
//! 戻り値は `Arc<dyn Any>` で、その中身は次のいずれか:
//! - `Arc<dyn RequestHandler<R>>`
//! - `Arc<dyn NotificationHandler<N>>`
//! - `Arc<dyn PipelineBehavior<R>>`
//!
//! 中身を正しく作るため、`ServiceEntry` のコンストラクタを使う。

use std::any::{Any, type_name};
use std::sync::Arc;

use crate::domain::{MediatorError, Notification, Request, RequestKey, TypeKey};
use crate::typed::{NotificationHandler, PipelineBehavior, RequestHandler};

/// 型消去されたサービス（Handler / Behavior）
#[derive(Clone)]
pub struct ServiceEntry {
    name: &'static str,
    service: Arc<dyn Any + Send + Sync>,
}

impl ServiceEntry {
    pub fn request_handler<R: Request>(
        name: &'static str,
        handler: Arc<dyn RequestHandler<R>>,
    ) -> Self {
        Self {
            name,
            service: Arc::new(handler),
        }
    }

    pub fn notification_handler<N: Notification>(
        name: &'static str,
        handler: Arc<dyn NotificationHandler<N>>,
    ) -> Self {
        Self {
            name,
            service: Arc::new(handler),
        }
    }

    pub fn behavior<R: Request>(name: &'static str, behavior: Arc<dyn PipelineBehavior<R>>) -> Self {
        Self {
            name,
            service: Arc::new(behavior),
        }
    }

    /// 登録時の実装型名（ログ・エラー用）
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 中身を `T` として取り出す
    ///
    /// 中身が違う型なら `MediatorError::InvalidService`。
    pub fn downcast<T: Clone + 'static>(&self) -> Result<T, MediatorError> {
        self.service
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| MediatorError::InvalidService {
                service: self.name,
                expected: type_name::<T>(),
            })
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry").field("name", &self.name).finish()
    }
}

/// HandlerRegistry は (request, response) / notification の型から登録済みサービスを返す
///
/// # 契約
/// - `resolve_request_handler`: 0 か 1 件
/// - `resolve_notification_handlers`: 0..N 件
/// - `resolve_behaviors`: 0..N 件、登録順（先頭が一番外側）
///
/// # Thread Safety
/// - 複数の send / publish から同時に呼ばれるので `Send + Sync`
pub trait HandlerRegistry: Send + Sync {
    fn resolve_request_handler(&self, key: RequestKey) -> Option<ServiceEntry>;

    fn resolve_notification_handlers(&self, notification: TypeKey) -> Vec<ServiceEntry>;

    fn resolve_behaviors(&self, key: RequestKey) -> Vec<ServiceEntry>;
}

impl<T: HandlerRegistry + ?Sized> HandlerRegistry for Arc<T> {
    fn resolve_request_handler(&self, key: RequestKey) -> Option<ServiceEntry> {
        (**self).resolve_request_handler(key)
    }

    fn resolve_notification_handlers(&self, notification: TypeKey) -> Vec<ServiceEntry> {
        (**self).resolve_notification_handlers(notification)
    }

    fn resolve_behaviors(&self, key: RequestKey) -> Vec<ServiceEntry> {
        (**self).resolve_behaviors(key)
    }
}
