//! DelegateCache - 具体型ごとの呼び出し thunk のキャッシュ
//!
//! # 学習ポイント
//! - `DashMap` の `entry().or_insert_with()` による原子的な get-or-create
//! - 読み取りの fast path（`get`）と初回作成の slow path を分ける
//!
//! 同じ型の初回アクセスが同時に来ても、factory が呼ばれるのは 1 回だけで、
//! 全員が同じ値を受け取る（後勝ちではない）。

use dashmap::DashMap;
use tracing::trace;

use crate::domain::TypeKey;

/// DelegateCache は `TypeKey` → thunk の対応を Mediator の寿命の間保持する
///
/// 一度入った値は差し替えない。削除もしない。
pub struct DelegateCache<V> {
    entries: DashMap<TypeKey, V>,
}

impl<V: Clone> DelegateCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// `key` の値を返す。無ければ `factory` で作って入れる
    pub fn get_or_create(&self, key: TypeKey, factory: impl FnOnce() -> V) -> V {
        if let Some(entry) = self.entries.get(&key) {
            return entry.value().clone();
        }
        // shard の write lock を持ったまま作るので、同じ key の factory は 1 回しか走らない
        self.entries
            .entry(key)
            .or_insert_with(|| {
                trace!(message_type = key.name(), "populating delegate cache");
                factory()
            })
            .value()
            .clone()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for DelegateCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
