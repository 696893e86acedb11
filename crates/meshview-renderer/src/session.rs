//! ビューアセッション
//!
//! ホストからのコマンド（読み込み、計測、視点リセット、入力）を受け、
//! シーンと計測状態を更新してイベントを `EventSink` に積む。
//! GPUもDOMも触らないので、ネイティブでそのままテストできる。

use glam::Vec2;
use meshview_core::{
    ClickOutcome, EventSink, LoadError, LoadStatus, LoadTicket, LoadTracker, Lifecycle,
    MeasurementPicker, MeshModel, ModelDimensions, PickerState, Result, UnitSystem, ViewAngles,
    ViewerConfig, ViewerEvent, ViewerSnapshot,
};

use crate::orbit::DragMode;
use crate::scene::Scene;

/// ポインタのボタン（DOMの `button` 値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    pub fn from_dom(button: i16) -> Option<Self> {
        match button {
            0 => Some(PointerButton::Primary),
            1 => Some(PointerButton::Middle),
            2 => Some(PointerButton::Secondary),
            _ => None,
        }
    }

    fn drag_mode(self) -> DragMode {
        match self {
            PointerButton::Primary => DragMode::Rotate,
            PointerButton::Middle | PointerButton::Secondary => DragMode::Pan,
        }
    }
}

/// 押下中のポインタ操作
/// 移動量が閾値を超えるまではクリック候補で、カメラは動かさない
#[derive(Debug, Clone, Copy)]
struct PointerGesture {
    button: PointerButton,
    start: Vec2,
    dragging: bool,
}

pub struct ViewerSession<S: EventSink> {
    config: ViewerConfig,
    scene: Scene,
    picker: MeasurementPicker,
    loads: LoadTracker,
    lifecycle: Lifecycle,
    gesture: Option<PointerGesture>,
    sink: S,
}

impl<S: EventSink> ViewerSession<S> {
    pub fn new(config: ViewerConfig, width: u32, height: u32, sink: S) -> Result<Self> {
        config.validate()?;
        let scene = Scene::new(&config, width, height);
        let picker = MeasurementPicker::new(config.markers.clone(), config.units);

        Ok(Self {
            config,
            scene,
            picker,
            loads: LoadTracker::new(),
            lifecycle: Lifecycle::default(),
            gesture: None,
            sink,
        })
    }

    /// 描画ループ開始時に呼ぶ
    pub fn start(&mut self) -> bool {
        self.lifecycle.start()
    }

    // ========================================================================
    // 読み込み
    // ========================================================================

    /// 新しい読み込みを開始。以前の読み込み結果は以後無視される
    pub fn begin_load(&mut self, url: &str) -> Option<LoadTicket> {
        if self.lifecycle.is_disposed() {
            return None;
        }
        // 読み込み中は空のシーン。旧モデルへの計測・ピックは受け付けない
        self.clear_measurements();
        if self.scene.clear_model() {
            tracing::debug!("Previous mesh released for new load");
        }

        let ticket = self.loads.begin(url);
        tracing::info!("Loading mesh from {} (ticket {})", url, ticket.id());
        Some(ticket)
    }

    /// 読み込み結果を適用。古いチケットや破棄後はfalseで何もしない
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<MeshModel, LoadError>,
    ) -> bool {
        if self.lifecycle.is_disposed() || !self.loads.is_current(ticket) {
            tracing::debug!("Discarding superseded load (ticket {})", ticket.id());
            return false;
        }

        self.clear_measurements();

        match result {
            Ok(model) => {
                self.loads.complete(ticket);
                let dimensions = model.dimensions();
                tracing::info!(
                    "Mesh loaded: {} triangles, {:.2} x {:.2} x {:.2} mm",
                    model.triangle_count(),
                    dimensions.width,
                    dimensions.height,
                    dimensions.depth
                );
                self.scene.set_model(model);
                self.reset_view();
                self.sink.emit(ViewerEvent::ModelDimensionsCalculated(dimensions));
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!("Mesh load failed: {}", message);
                self.loads.fail(ticket, message.clone());
                self.sink.emit(ViewerEvent::LoadFailed(message));
            }
        }
        true
    }

    pub fn status(&self) -> &LoadStatus {
        self.loads.status()
    }

    // ========================================================================
    // 計測
    // ========================================================================

    /// 計測モードを切り替え、armedかどうかを返す
    pub fn toggle_measurement(&mut self) -> bool {
        if self.lifecycle.is_disposed() {
            return false;
        }
        self.picker.toggle(self.scene.overlay_mut()) != PickerState::Idle
    }

    pub fn reset_measurements(&mut self) {
        if self.lifecycle.is_disposed() {
            return;
        }
        self.picker.reset(self.scene.overlay_mut());
        self.sink.emit(ViewerEvent::MeasurementChanged(None));
    }

    /// モデル差し替え時の計測破棄。点があった場合のみ通知する
    fn clear_measurements(&mut self) {
        let had_measurements = self.picker.point_count() > 0;
        self.picker.reset(self.scene.overlay_mut());
        if had_measurements {
            self.sink.emit(ViewerEvent::MeasurementChanged(None));
        }
    }

    /// スクリーン座標でのクリック
    pub fn click(&mut self, x: f32, y: f32) -> ClickOutcome {
        if self.lifecycle.is_disposed() {
            return ClickOutcome::Ignored;
        }
        self.scene.sync_camera();
        let (surface, overlay) = self.scene.split_for_pick();
        let outcome = self.picker.click(&surface, overlay, x, y);
        if let ClickOutcome::Completed { distance_mm } = outcome {
            self.sink.emit(ViewerEvent::MeasurementChanged(Some(distance_mm)));
        }
        outcome
    }

    pub fn picker_state(&self) -> PickerState {
        self.picker.state()
    }

    pub fn picker(&self) -> &MeasurementPicker {
        &self.picker
    }

    pub fn set_units(&mut self, units: UnitSystem) {
        if self.lifecycle.is_disposed() {
            return;
        }
        self.config.units = units;
        self.picker.set_units(units, self.scene.overlay_mut());
    }

    pub fn units(&self) -> UnitSystem {
        self.config.units
    }

    // ========================================================================
    // カメラ / 入力
    // ========================================================================

    /// 既定の視点へ即座に戻す。ドラッグ中ならジェスチャーも中断する
    pub fn reset_view(&mut self) {
        if self.lifecycle.is_disposed() {
            return;
        }
        self.gesture = None;
        let angles = self.scene.controls_mut().reset();
        self.scene.sync_camera();
        self.sink.emit(ViewerEvent::ViewAnglesChanged(angles));
    }

    pub fn pointer_down(&mut self, button: PointerButton, x: f32, y: f32) {
        if self.lifecycle.is_disposed() {
            return;
        }
        self.gesture = Some(PointerGesture {
            button,
            start: Vec2::new(x, y),
            dragging: false,
        });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let position = Vec2::new(x, y);

        if !gesture.dragging {
            if position.distance(gesture.start) < self.config.click_tolerance_px {
                return;
            }
            gesture.dragging = true;
            let (mode, start) = (gesture.button.drag_mode(), gesture.start);
            self.scene.controls_mut().begin_drag(mode, start);
        }
        self.scene.controls_mut().drag_to(position);
    }

    /// ポインタ解放。閾値未満の主ボタン操作はクリックとして処理する
    pub fn pointer_up(&mut self, x: f32, y: f32) -> Option<ClickOutcome> {
        let gesture = self.gesture.take()?;
        if gesture.dragging {
            self.scene.controls_mut().end_drag();
            return None;
        }
        if gesture.button != PointerButton::Primary {
            return None;
        }
        let moved = Vec2::new(x, y).distance(gesture.start);
        if moved >= self.config.click_tolerance_px {
            return None;
        }
        Some(self.click(x, y))
    }

    /// ポインタキャプチャ喪失など
    pub fn pointer_cancel(&mut self) {
        self.gesture = None;
        self.scene.controls_mut().end_drag();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        if self.lifecycle.is_disposed() {
            return;
        }
        self.scene.controls_mut().zoom(delta_y);
    }

    pub fn is_dragging(&self) -> bool {
        self.scene.controls().is_dragging()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.lifecycle.is_disposed() {
            return false;
        }
        let changed = self.scene.resize(width, height);
        if changed {
            tracing::debug!("Viewport resized to {}x{}", width, height);
        }
        changed
    }

    /// 1フレーム分の更新（描画の直前に呼ぶ）
    pub fn frame(&mut self) {
        if self.lifecycle.is_disposed() {
            return;
        }
        if let Some(angles) = self.scene.controls_mut().update() {
            self.sink.emit(ViewerEvent::ViewAnglesChanged(angles));
        }
        self.scene.sync_camera();
    }

    // ========================================================================
    // スクリーンショット
    // ========================================================================

    /// キャプチャ結果を通知する。計測やカメラの状態は変えない
    pub fn record_snapshot(&mut self, snapshot: ViewerSnapshot) {
        if self.lifecycle.is_disposed() {
            return;
        }
        tracing::info!(
            "Screenshot captured: {}x{}, {} bytes",
            snapshot.width,
            snapshot.height,
            snapshot.len()
        );
        self.sink.emit(ViewerEvent::ScreenshotTaken(snapshot));
    }

    // ========================================================================
    // 問い合わせ
    // ========================================================================

    pub fn view_angles(&self) -> Option<ViewAngles> {
        (!self.lifecycle.is_disposed()).then(|| self.scene.controls().angles())
    }

    pub fn distance(&self) -> Option<f32> {
        if self.lifecycle.is_disposed() {
            return None;
        }
        self.picker.latest_distance()
    }

    pub fn model_dimensions(&self) -> Option<ModelDimensions> {
        if self.lifecycle.is_disposed() {
            return None;
        }
        self.scene.model().map(MeshModel::dimensions)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ========================================================================
    // 破棄
    // ========================================================================

    /// 状態を破棄する。2回目以降は何もせずfalse
    pub fn dispose(&mut self) -> bool {
        if !self.lifecycle.dispose() {
            return false;
        }
        self.gesture = None;
        self.scene.controls_mut().end_drag();
        self.loads.invalidate();
        self.picker.reset(self.scene.overlay_mut());
        self.scene.clear_model();
        tracing::info!("Viewer session disposed");
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }
}

impl ViewerSession<Vec<ViewerEvent>> {
    /// 積まれたイベントを取り出す
    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::cube_model;

    fn session() -> ViewerSession<Vec<ViewerEvent>> {
        ViewerSession::new(ViewerConfig::default(), 800, 600, Vec::new()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ViewerConfig::default();
        config.normalized_size = 0.0;
        assert!(ViewerSession::new(config, 800, 600, Vec::<ViewerEvent>::new()).is_err());
    }

    #[test]
    fn test_successful_load_emits_dimensions_once() {
        let mut session = session();
        let ticket = session.begin_load("cube.stl").unwrap();
        assert!(session.finish_load(ticket, Ok(cube_model(10.0))));

        let events = session.drain_events();
        let dims: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ViewerEvent::ModelDimensionsCalculated(_)))
            .collect();
        assert_eq!(dims.len(), 1);
        assert_eq!(session.model_dimensions().unwrap().width, 10.0);
        assert!(matches!(session.status(), LoadStatus::Ready { .. }));
    }

    #[test]
    fn test_failed_load_drops_previous_mesh() {
        let mut session = session();
        let first = session.begin_load("a.stl").unwrap();
        session.finish_load(first, Ok(cube_model(10.0)));
        session.drain_events();

        let second = session.begin_load("b.stl").unwrap();
        session.finish_load(second, Err(LoadError::HttpStatus(404)));

        assert!(session.model_dimensions().is_none());
        assert!(matches!(session.status(), LoadStatus::Failed { .. }));
        assert_eq!(
            session.drain_events(),
            vec![ViewerEvent::LoadFailed(LoadError::HttpStatus(404).to_string())]
        );
    }

    #[test]
    fn test_small_pointer_travel_is_a_click() {
        let mut session = session();
        session.toggle_measurement();
        let before = session.view_angles();

        session.pointer_down(PointerButton::Primary, 100.0, 100.0);
        session.pointer_move(102.0, 101.0);
        let outcome = session.pointer_up(102.0, 101.0);

        // モデル未読み込みなのでピックは外れる
        assert_eq!(outcome, Some(ClickOutcome::Miss));
        assert_eq!(session.scene().controls().goal().angles(), before.unwrap());
    }

    #[test]
    fn test_large_pointer_travel_is_a_drag() {
        let mut session = session();
        session.toggle_measurement();

        session.pointer_down(PointerButton::Primary, 100.0, 100.0);
        session.pointer_move(160.0, 100.0);
        assert!(session.is_dragging());
        assert_eq!(session.pointer_up(160.0, 100.0), None);
        assert!(!session.is_dragging());
        assert_eq!(session.picker_state(), PickerState::Armed);
    }

    #[test]
    fn test_drag_settles_and_emits_angles_once() {
        let mut session = session();
        session.pointer_down(PointerButton::Primary, 0.0, 0.0);
        session.pointer_move(50.0, 0.0);
        session.pointer_up(50.0, 0.0);

        for _ in 0..1000 {
            session.frame();
        }
        let angles: Vec<_> = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, ViewerEvent::ViewAnglesChanged(_)))
            .collect();
        assert_eq!(angles.len(), 1);
    }

    #[test]
    fn test_commands_after_dispose_are_no_ops() {
        let mut session = session();
        assert!(session.dispose());
        assert!(!session.dispose());

        assert!(session.begin_load("a.stl").is_none());
        assert!(!session.toggle_measurement());
        session.reset_view();
        session.reset_measurements();
        session.frame();

        assert!(session.drain_events().is_empty());
        assert!(session.view_angles().is_none());
        assert!(session.distance().is_none());
        assert!(session.model_dimensions().is_none());
    }

    #[test]
    fn test_load_resolving_after_dispose_is_discarded() {
        let mut session = session();
        let ticket = session.begin_load("a.stl").unwrap();
        session.dispose();

        assert!(!session.finish_load(ticket, Ok(cube_model(10.0))));
        assert!(session.scene().model().is_none());
        assert!(session.drain_events().is_empty());
    }
}
