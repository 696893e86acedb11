use crate::components::{Label, Transform};
use crate::math::Vec3;

use super::node::NodeId;

/// オーバーレイノードの種類
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    /// 計測点のマーカー（球）
    Marker { radius: f32 },
    /// マーカー周囲の半透明ハロー
    Halo { radius: f32 },
    /// 2点を結ぶ線
    Line { start: Vec3, end: Vec3, width: f32 },
    /// 距離表示ラベル（ビルボード）
    Label { label: Label, height: f32 },
}

/// オーバーレイノード
/// 位置はシーン空間（正規化後の座標系）
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    pub kind: OverlayKind,
    pub transform: Transform,
    pub color: [f32; 4],
}

impl OverlayNode {
    pub fn marker(position: Vec3, radius: f32, color: [f32; 4]) -> Self {
        Self {
            kind: OverlayKind::Marker { radius },
            transform: Transform::from_position(position),
            color,
        }
    }

    pub fn halo(position: Vec3, radius: f32, color: [f32; 4]) -> Self {
        Self {
            kind: OverlayKind::Halo { radius },
            transform: Transform::from_position(position),
            color,
        }
    }

    pub fn line(start: Vec3, end: Vec3, width: f32, color: [f32; 4]) -> Self {
        Self {
            kind: OverlayKind::Line { start, end, width },
            transform: Transform::from_position((start + end) * 0.5),
            color,
        }
    }

    pub fn label(anchor: Vec3, text: impl Into<String>, height: f32, color: [f32; 4]) -> Self {
        Self {
            kind: OverlayKind::Label {
                label: Label::new(text),
                height,
            },
            transform: Transform::from_position(anchor),
            color,
        }
    }

    /// ノード位置（ラベルのアンカー、マーカー中心など）
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }
}

/// スロット生存情報
struct Slot {
    /// 現在の世代番号
    generation: u32,
    node: Option<OverlayNode>,
}

/// 計測用オーバーレイグループ
///
/// マーカー・線・ラベルを保持するシーングラフの部分木。
/// 破棄したノードのIDは `released` に積まれ、GPU側が次フレームで
/// 対応するバッファ/テクスチャを明示的に解放する。
#[derive(Default)]
pub struct OverlayGroup {
    slots: Vec<Slot>,
    /// 再利用可能なインデックス
    free_list: Vec<u32>,
    /// 破棄済みでGPU解放待ちのノード
    released: Vec<NodeId>,
    revision: u64,
}

impl OverlayGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// ノードを追加
    pub fn spawn(&mut self, node: OverlayNode) -> NodeId {
        self.revision += 1;

        if let Some(index) = self.free_list.pop() {
            // 再利用: 世代番号をインクリメント
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                node: Some(node),
            });
            NodeId::new(index, 1)
        }
    }

    /// ノードを破棄
    /// 成功時true、既に破棄済みまたは無効なIDの場合false
    pub fn despawn(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return false;
        };
        if slot.generation != id.generation() || slot.node.is_none() {
            return false;
        }

        slot.node = None;
        self.free_list.push(id.index());
        self.released.push(id);
        self.revision += 1;
        true
    }

    /// ノードが生存しているか確認
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|slot| slot.generation == id.generation() && slot.node.is_some())
    }

    pub fn get(&self, id: NodeId) -> Option<&OverlayNode> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut OverlayNode> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        if slot.node.is_some() {
            self.revision += 1;
        }
        slot.node.as_mut()
    }

    /// 全生存ノードをイテレート
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &OverlayNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    /// 生存ノード数
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全ノードを破棄
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.despawn(id);
        }
    }

    /// GPU解放待ちのノードIDを取り出す
    pub fn drain_released(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.released)
    }

    /// 構造またはノード内容が変わるたびに増える
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
