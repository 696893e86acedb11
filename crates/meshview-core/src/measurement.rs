//! 2点計測のステートマシン
//!
//! Idle → Armed → OnePoint → Idle。完了したペアは明示的なリセットまで残る。
//! マーカー等のノードはオーバーレイグループに生成し、IDだけを保持する。

use crate::config::MarkerStyle;
use crate::math::Vec3;
use crate::scene::{NodeId, OverlayGroup, OverlayKind, OverlayNode};
use crate::units::UnitSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickerState {
    /// 新しいペアを収集していない
    #[default]
    Idle,
    /// 1点目待ち
    Armed,
    /// 2点目待ち
    OnePoint,
}

/// 表面上の交点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// シーン座標（正規化後）
    pub scene: Vec3,
    /// モデル座標（mm）
    pub model: Vec3,
}

/// スクリーン座標からメッシュ表面の点を求める
pub trait SurfacePicker {
    /// 外れた場合はNone
    fn pick_surface_point(&self, x: f32, y: f32) -> Option<SurfaceHit>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPoint {
    pub scene: Vec3,
    pub model: Vec3,
    pub marker: NodeId,
    pub halo: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPair {
    pub first: MeasurementPoint,
    pub second: MeasurementPoint,
    pub line: NodeId,
    pub label: NodeId,
    pub distance_mm: f32,
}

impl MeasurementPair {
    fn node_ids(&self) -> [NodeId; 6] {
        [
            self.first.marker,
            self.first.halo,
            self.second.marker,
            self.second.halo,
            self.line,
            self.label,
        ]
    }
}

/// クリック処理の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Idle中のクリック（ピックしない）
    Ignored,
    /// メッシュに当たらなかった
    Miss,
    FirstPoint,
    Completed { distance_mm: f32 },
}

#[derive(Debug, Default)]
pub struct MeasurementPicker {
    state: PickerState,
    pending: Option<MeasurementPoint>,
    pairs: Vec<MeasurementPair>,
    style: MarkerStyle,
    units: UnitSystem,
}

impl MeasurementPicker {
    pub fn new(style: MarkerStyle, units: UnitSystem) -> Self {
        Self {
            style,
            units,
            ..Default::default()
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state != PickerState::Idle
    }

    /// 計測モードの切り替え。Armed/OnePointからはIdleへ戻り、未完成の点は破棄する
    pub fn toggle(&mut self, overlay: &mut OverlayGroup) -> PickerState {
        self.state = match self.state {
            PickerState::Idle => PickerState::Armed,
            PickerState::Armed | PickerState::OnePoint => {
                self.discard_pending(overlay);
                PickerState::Idle
            }
        };
        tracing::debug!("Measurement picker -> {:?}", self.state);
        self.state
    }

    /// クリック処理。Idle中はピック自体を行わない
    pub fn click<P: SurfacePicker + ?Sized>(
        &mut self,
        picker: &P,
        overlay: &mut OverlayGroup,
        x: f32,
        y: f32,
    ) -> ClickOutcome {
        if self.state == PickerState::Idle {
            return ClickOutcome::Ignored;
        }

        let Some(hit) = picker.pick_surface_point(x, y) else {
            return ClickOutcome::Miss;
        };

        match self.pending.take() {
            None => {
                self.pending = Some(self.spawn_point(hit, overlay));
                self.state = PickerState::OnePoint;
                ClickOutcome::FirstPoint
            }
            Some(first) => {
                let second = self.spawn_point(hit, overlay);
                let distance_mm = first.model.distance(second.model);

                let line = overlay.spawn(OverlayNode::line(
                    first.scene,
                    second.scene,
                    self.style.line_width,
                    self.style.line_color,
                ));
                let anchor = (first.scene + second.scene) * 0.5 + Vec3::Y * self.style.label_lift;
                let label = overlay.spawn(OverlayNode::label(
                    anchor,
                    self.units.format_distance(distance_mm),
                    self.style.label_height,
                    self.style.label_color,
                ));

                self.pairs.push(MeasurementPair {
                    first,
                    second,
                    line,
                    label,
                    distance_mm,
                });
                self.state = PickerState::Idle;
                tracing::info!("Measurement completed: {:.3} mm", distance_mm);
                ClickOutcome::Completed { distance_mm }
            }
        }
    }

    /// 全ペアと未完成の点を破棄してIdleへ戻る
    pub fn reset(&mut self, overlay: &mut OverlayGroup) {
        self.discard_pending(overlay);
        for pair in self.pairs.drain(..) {
            for id in pair.node_ids() {
                overlay.despawn(id);
            }
        }
        self.state = PickerState::Idle;
    }

    /// 直近に完成したペアの距離(mm)
    pub fn latest_distance(&self) -> Option<f32> {
        self.pairs.last().map(|pair| pair.distance_mm)
    }

    pub fn pairs(&self) -> &[MeasurementPair] {
        &self.pairs
    }

    pub fn pending(&self) -> Option<&MeasurementPoint> {
        self.pending.as_ref()
    }

    /// 配置済みの点の数（未完成の点を含む）
    pub fn point_count(&self) -> usize {
        self.pairs.len() * 2 + usize::from(self.pending.is_some())
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// 表示単位を変更し、既存ラベルを書き換える。距離値は変わらない
    pub fn set_units(&mut self, units: UnitSystem, overlay: &mut OverlayGroup) {
        self.units = units;
        for pair in &self.pairs {
            if let Some(node) = overlay.get_mut(pair.label) {
                if let OverlayKind::Label { label, .. } = &mut node.kind {
                    label.set_text(units.format_distance(pair.distance_mm));
                }
            }
        }
    }

    fn spawn_point(&self, hit: SurfaceHit, overlay: &mut OverlayGroup) -> MeasurementPoint {
        let marker = overlay.spawn(OverlayNode::marker(
            hit.scene,
            self.style.marker_radius,
            self.style.marker_color,
        ));
        let halo = overlay.spawn(OverlayNode::halo(
            hit.scene,
            self.style.halo_radius,
            self.style.halo_color,
        ));
        MeasurementPoint {
            scene: hit.scene,
            model: hit.model,
            marker,
            halo,
        }
    }

    fn discard_pending(&mut self, overlay: &mut OverlayGroup) {
        if let Some(point) = self.pending.take() {
            overlay.despawn(point.marker);
            overlay.despawn(point.halo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    /// x座標をそのままモデル座標のXにする平面
    struct PlanePicker {
        calls: Cell<usize>,
    }

    impl PlanePicker {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl SurfacePicker for PlanePicker {
        fn pick_surface_point(&self, x: f32, y: f32) -> Option<SurfaceHit> {
            self.calls.set(self.calls.get() + 1);
            if x < 0.0 {
                return None;
            }
            let model = Vec3::new(x, y, 0.0);
            Some(SurfaceHit {
                scene: model * 0.1,
                model,
            })
        }
    }

    fn picker() -> (MeasurementPicker, OverlayGroup, PlanePicker) {
        (
            MeasurementPicker::new(MarkerStyle::default(), UnitSystem::Millimeters),
            OverlayGroup::new(),
            PlanePicker::new(),
        )
    }

    fn label_text(overlay: &OverlayGroup, id: NodeId) -> String {
        match overlay.get(id).map(|node| &node.kind) {
            Some(OverlayKind::Label { label, .. }) => label.as_str().to_string(),
            other => panic!("expected label node, got {:?}", other),
        }
    }

    #[test]
    fn test_two_clicks_complete_a_pair() {
        let (mut picker, mut overlay, surface) = picker();
        picker.toggle(&mut overlay);

        assert_eq!(picker.click(&surface, &mut overlay, 0.0, 0.0), ClickOutcome::FirstPoint);
        assert_eq!(picker.state(), PickerState::OnePoint);

        let outcome = picker.click(&surface, &mut overlay, 3.0, 4.0);
        assert_eq!(outcome, ClickOutcome::Completed { distance_mm: 5.0 });
        assert_eq!(picker.state(), PickerState::Idle);
        assert_eq!(picker.latest_distance(), Some(5.0));
        // マーカー2 + ハロー2 + 線 + ラベル
        assert_eq!(overlay.len(), 6);
        assert_eq!(label_text(&overlay, picker.pairs()[0].label), "5.00 mm");
    }

    #[test]
    fn test_idle_click_does_not_pick() {
        let (mut picker, mut overlay, surface) = picker();
        assert_eq!(picker.click(&surface, &mut overlay, 1.0, 1.0), ClickOutcome::Ignored);
        assert_eq!(surface.calls.get(), 0);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_miss_is_a_no_op() {
        let (mut picker, mut overlay, surface) = picker();
        picker.toggle(&mut overlay);
        assert_eq!(picker.click(&surface, &mut overlay, -1.0, 0.0), ClickOutcome::Miss);
        assert_eq!(picker.state(), PickerState::Armed);

        picker.click(&surface, &mut overlay, 1.0, 0.0);
        let revision = overlay.revision();
        assert_eq!(picker.click(&surface, &mut overlay, -1.0, 0.0), ClickOutcome::Miss);
        assert_eq!(picker.state(), PickerState::OnePoint);
        assert_eq!(picker.point_count(), 1);
        assert_eq!(overlay.revision(), revision);
    }

    #[test]
    fn test_toggle_twice_returns_to_idle() {
        let (mut picker, mut overlay, _) = picker();
        assert_eq!(picker.toggle(&mut overlay), PickerState::Armed);
        assert_eq!(picker.toggle(&mut overlay), PickerState::Idle);
        assert_eq!(picker.point_count(), 0);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_toggle_discards_pending_point() {
        let (mut picker, mut overlay, surface) = picker();
        picker.toggle(&mut overlay);
        picker.click(&surface, &mut overlay, 1.0, 0.0);
        assert_eq!(overlay.len(), 2);

        assert_eq!(picker.toggle(&mut overlay), PickerState::Idle);
        assert!(picker.pending().is_none());
        assert!(overlay.is_empty());
        assert_eq!(overlay.drain_released().len(), 2);
    }

    #[test]
    fn test_completed_pairs_accumulate() {
        let (mut picker, mut overlay, surface) = picker();
        for offset in [0.0, 10.0] {
            picker.toggle(&mut overlay);
            picker.click(&surface, &mut overlay, offset, 0.0);
            picker.click(&surface, &mut overlay, offset + 2.0, 0.0);
        }
        assert_eq!(picker.pairs().len(), 2);
        assert_eq!(picker.point_count(), 4);
        assert_eq!(overlay.len(), 12);
    }

    #[test]
    fn test_reset_twice_matches_reset_once() {
        let (mut picker, mut overlay, surface) = picker();
        picker.toggle(&mut overlay);
        picker.click(&surface, &mut overlay, 0.0, 0.0);
        picker.click(&surface, &mut overlay, 1.0, 0.0);
        picker.toggle(&mut overlay);
        picker.click(&surface, &mut overlay, 5.0, 0.0);

        picker.reset(&mut overlay);
        let released = overlay.drain_released().len();
        picker.reset(&mut overlay);

        assert_eq!(released, 8);
        assert!(overlay.drain_released().is_empty());
        assert!(overlay.is_empty());
        assert_eq!(picker.state(), PickerState::Idle);
        assert_eq!(picker.latest_distance(), None);
        assert_eq!(picker.point_count(), 0);
    }

    #[test]
    fn test_set_units_relabels_without_changing_distance() {
        let (mut picker, mut overlay, surface) = picker();
        picker.toggle(&mut overlay);
        picker.click(&surface, &mut overlay, 0.0, 0.0);
        picker.click(&surface, &mut overlay, 25.4, 0.0);

        picker.set_units(UnitSystem::Inches, &mut overlay);
        assert_eq!(label_text(&overlay, picker.pairs()[0].label), "1.000 in");
        assert_eq!(picker.latest_distance(), Some(25.4));
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(
            ax in 0.0f32..100.0, ay in -100.0f32..100.0,
            bx in 0.0f32..100.0, by in -100.0f32..100.0,
        ) {
            let measure = |p: (f32, f32), q: (f32, f32)| {
                let (mut picker, mut overlay, surface) = picker();
                picker.toggle(&mut overlay);
                picker.click(&surface, &mut overlay, p.0, p.1);
                picker.click(&surface, &mut overlay, q.0, q.1);
                picker.latest_distance()
            };
            let forward = measure((ax, ay), (bx, by));
            let backward = measure((bx, by), (ax, ay));
            prop_assert_eq!(forward, backward);
        }
    }
}
