#![allow(dead_code)]

use glam::Vec3;
use meshview_core::{CameraConfig, MeshModel, ViewerConfig, ViewerEvent};
use meshview_renderer::ViewerSession;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
pub const CENTER: (f32, f32) = (WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0);

/// 原点を角とする直方体（mm）
pub fn box_model(size: Vec3) -> MeshModel {
    let positions = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 != 0 { size.x } else { 0.0 },
                if i & 2 != 0 { size.y } else { 0.0 },
                if i & 4 != 0 { size.z } else { 0.0 },
            )
        })
        .collect();
    let indices = vec![
        0, 2, 1, 1, 2, 3, // -Z
        4, 5, 6, 5, 7, 6, // +Z
        0, 1, 4, 1, 5, 4, // -Y
        2, 6, 3, 3, 6, 7, // +Y
        0, 4, 2, 2, 4, 6, // -X
        1, 3, 5, 3, 7, 5, // +X
    ];
    MeshModel::from_indexed(positions, indices, 2.0).expect("valid box")
}

pub fn cube_model(size: f32) -> MeshModel {
    box_model(Vec3::splat(size))
}

/// 正面（+Z側）から見るカメラ設定
pub fn front_view_config() -> ViewerConfig {
    ViewerConfig {
        camera: CameraConfig {
            azimuth: 0.0,
            elevation: 0.0,
            ..CameraConfig::default()
        },
        ..ViewerConfig::default()
    }
}

pub fn session_with(config: ViewerConfig) -> ViewerSession<Vec<ViewerEvent>> {
    ViewerSession::new(config, WIDTH, HEIGHT, Vec::new()).expect("valid config")
}

/// モデルを読み込んだ状態のセッション（イベントは空にしておく）
pub fn loaded_session(config: ViewerConfig, model: MeshModel) -> ViewerSession<Vec<ViewerEvent>> {
    let mut session = session_with(config);
    session.start();
    let ticket = session.begin_load("model.stl").expect("not disposed");
    assert!(session.finish_load(ticket, Ok(model)));
    session.drain_events();
    session
}

/// 主ボタンでのクリック（押して離すだけ）
pub fn click(session: &mut ViewerSession<Vec<ViewerEvent>>, x: f32, y: f32) {
    session.pointer_down(meshview_renderer::PointerButton::Primary, x, y);
    session.pointer_up(x, y);
}

/// カメラが静止するまでフレームを進める
pub fn run_until_settled(session: &mut ViewerSession<Vec<ViewerEvent>>) {
    for _ in 0..10_000 {
        session.frame();
        if session.scene().controls().is_settled() {
            return;
        }
    }
    panic!("camera never settled");
}

pub fn measurement_events(events: &[ViewerEvent]) -> Vec<Option<f32>> {
    events
        .iter()
        .filter_map(|event| match event {
            ViewerEvent::MeasurementChanged(distance) => Some(*distance),
            _ => None,
        })
        .collect()
}
