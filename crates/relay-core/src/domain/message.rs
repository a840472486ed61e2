//! Message traits - Request / Notification と型の識別子
//!
//! # 学習ポイント
//! - Associated Type (`type Response`) で Request と Response を静的に対応付ける
//! - `TypeId` + `type_name` による実行時の型識別（エラーメッセージ用に名前も保持）

use std::any::{TypeId, type_name};
use std::fmt;

/// Request は「ちょうど 1 つの Handler」に届き、`Response` を 1 つ返す
///
/// # 使用例
/// ```ignore
/// struct Echo {
///     value: i64,
/// }
///
/// impl Request for Echo {
///     type Response = i64;
/// }
/// ```
///
/// 値を返さないコマンドは `type Response = Unit;` を使う。
///
/// # Trait Bounds
/// - `Send + Sync`: behavior chain の中で `&R` を await 越しに持つため
/// - `'static`: `TypeId` でキャッシュ・レジストリを引くため
/// - `Response: Sync`: post processor が `&Response` を await 越しに持つため
pub trait Request: Send + Sync + 'static {
    type Response: Send + Sync + 'static;
}

/// Notification は 0..N 個の Handler にブロードキャストされる
///
/// Response は持たない。
pub trait Notification: Send + Sync + 'static {}

/// 具体型の識別子
///
/// `TypeId` だけでは表示できないので、`type_name` を一緒に持つ。
/// 等価性とハッシュは `TypeId` のみで決まる。
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// (request-type, response-type) の組
///
/// Handler と Behavior はこの組をキーに登録・解決される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub request: TypeKey,
    pub response: TypeKey,
}

impl RequestKey {
    pub fn of<R: Request>() -> Self {
        Self {
            request: TypeKey::of::<R>(),
            response: TypeKey::of::<R::Response>(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.request, self.response)
    }
}
