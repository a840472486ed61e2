//! Unit - 「意味のある値なし」を表す Response

use serde::{Deserialize, Serialize};
use std::fmt;

/// 値を返さないコマンドの Response
///
/// 状態を持たない zero-sized 型なので、全ての `Unit` は常に等しい。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unit;

impl Unit {
    pub const VALUE: Unit = Unit;
}

impl From<()> for Unit {
    fn from(_: ()) -> Self {
        Unit
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("()")
    }
}
