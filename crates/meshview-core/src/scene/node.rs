use std::num::NonZeroU32;

/// オーバーレイノード識別子（世代番号付き）
/// - index: スロット配列のインデックス
/// - generation: 再利用時の世代番号（破棄済みノードとの区別用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: NonZeroU32,
}

impl NodeId {
    /// 新しいNodeIdを作成
    /// generation 0 は無効値として予約されているため1に丸める
    pub fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation: NonZeroU32::new(generation).unwrap_or(NonZeroU32::MIN),
        }
    }

    /// インデックスを取得
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// 世代番号を取得
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.get()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
