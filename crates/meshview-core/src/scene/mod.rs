//! オーバーレイシーングラフ
//!
//! 計測マーカー・線・ラベルを保持する。読み込んだメッシュとは別管理。

mod node;
mod overlay;

pub use node::NodeId;
pub use overlay::{OverlayGroup, OverlayKind, OverlayNode};
