//! Errors - ディスパッチのエラー分類
//!
//! # 分類
//! - **入力エラー**: `NullRequest` / `NullNotification`（dynamic API に値が無い）
//! - **構成エラー**: `HandlerNotFound` / `NoHandlersRegistered`（登録漏れ）
//! - **実行エラー**: `Handler` / `Publish`（Handler・Behavior 内部で起きたエラー）
//!
//! Mediator はリトライもフォールバックもしない。実行エラーは Handler が返した
//! ものをそのまま呼び出し側に返す。

use std::fmt;

use super::message::{RequestKey, TypeKey};

/// Handler / Behavior が返す任意のエラー
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Handler / Behavior の戻り値
pub type HandlerResult<T> = Result<T, BoxError>;

/// MediatorError は send / publish の失敗
#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    #[error("request must not be null")]
    NullRequest,

    #[error("notification must not be null")]
    NullNotification,

    #[error("handler was not found for request of type {request} (response {response})")]
    HandlerNotFound { request: TypeKey, response: TypeKey },

    #[error("no handlers registered for notification of type {notification}")]
    NoHandlersRegistered { notification: TypeKey },

    /// Handler か Behavior が返したエラー（中身は変更しない）
    #[error(transparent)]
    Handler(BoxError),

    #[error(transparent)]
    Publish(#[from] AggregateError),

    /// レジストリが返したサービスの中身が期待した形ではない
    #[error("registered service {service} is not a {expected}")]
    InvalidService {
        service: &'static str,
        expected: &'static str,
    },

    /// dynamic API で型消去された値が想定と違う
    #[error("dispatch received a value of type {actual}, expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl MediatorError {
    pub(crate) fn handler_not_found(key: RequestKey) -> Self {
        Self::HandlerNotFound {
            request: key.request,
            response: key.response,
        }
    }

    /// chain から返ってきたエラーを包む
    ///
    /// Behavior の中で呼んだ send が返した `MediatorError` は二重に包まずそのまま返す。
    pub(crate) fn from_chain(err: BoxError) -> Self {
        match err.downcast::<MediatorError>() {
            Ok(inner) => *inner,
            Err(err) => Self::Handler(err),
        }
    }

    /// `Handler` の中身を具体的なエラー型として参照する
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// `Handler` の中身を取り出す
    pub fn into_handler_error(self) -> Option<BoxError> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }

    /// publish で失敗した Handler の一覧（publish 以外は空）
    pub fn failures(&self) -> &[HandlerFailure] {
        match self {
            Self::Publish(aggregate) => aggregate.failures(),
            _ => &[],
        }
    }
}

/// Handler が panic した
///
/// publish はこれを `HandlerFailure::error` に入れて返す。panic は呼び出し側に伝播しない。
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {message}")]
pub struct HandlerPanicked {
    pub message: String,
}

impl HandlerPanicked {
    /// `catch_unwind` が返した payload からメッセージを取り出す
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }
}

/// 1 つの notification handler の失敗
#[derive(Debug)]
pub struct HandlerFailure {
    /// レジストリが返した順序での位置
    pub index: usize,
    /// Handler の型名
    pub handler: &'static str,
    pub error: BoxError,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.handler, self.error)
    }
}

/// publish で失敗した全ての Handler
///
/// 1 件でも複数件でも同じ形で返す。どの Handler が失敗したかは失われない。
#[derive(Debug)]
pub struct AggregateError {
    notification: TypeKey,
    failures: Vec<HandlerFailure>,
}

impl AggregateError {
    pub(crate) fn new(notification: TypeKey, failures: Vec<HandlerFailure>) -> Self {
        Self {
            notification,
            failures,
        }
    }

    pub fn notification(&self) -> TypeKey {
        self.notification
    }

    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<HandlerFailure> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notification handler(s) failed for {}",
            self.failures.len(),
            self.notification
        )?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| failure.error.as_ref() as &(dyn std::error::Error + 'static))
    }
}
