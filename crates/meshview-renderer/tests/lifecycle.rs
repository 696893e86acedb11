mod common;

use common::*;
use meshview_core::{ViewerConfig, ViewerSnapshot};
use meshview_renderer::{encode_png, PointerButton};

/// 計測後にスクリーンショットを撮っても距離は変わらない
#[test]
fn screenshot_after_measurement_keeps_distance() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    session.toggle_measurement();
    click(&mut session, CENTER.0, CENTER.1);
    click(&mut session, CENTER.0 + 40.0, CENTER.1 + 15.0);
    let distance = session.distance();
    let angles = session.view_angles();
    session.drain_events();

    // GPUのかわりに読み戻し済みのピクセルを用意する
    let (width, height) = (8u32, 6u32);
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| [i as u8, 40, 200, 255])
        .collect();
    let png = encode_png(&pixels, width, height, true).unwrap();
    session.record_snapshot(ViewerSnapshot::new(png.clone(), width, height, 1_700_000_000_000.0));

    assert!(!png.is_empty());
    assert_eq!(&png[1..4], b"PNG");
    assert_eq!(session.distance(), distance);
    assert_eq!(session.view_angles(), angles);

    let events = session.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        meshview_core::ViewerEvent::ScreenshotTaken(shot) if shot.png == png && shot.width == 8
    ));
}

#[test]
fn dispose_is_idempotent_and_silences_commands() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    session.toggle_measurement();
    click(&mut session, CENTER.0, CENTER.1);

    assert!(session.dispose());
    assert!(!session.dispose());
    assert!(session.scene().overlay().is_empty());
    assert!(session.scene().model().is_none());

    session.pointer_down(PointerButton::Primary, 0.0, 0.0);
    session.pointer_move(300.0, 0.0);
    session.wheel(100.0);
    session.frame();
    session.reset_measurements();
    assert!(!session.resize(100, 100));

    assert!(session.drain_events().is_empty());
    assert!(session.view_angles().is_none());
    assert!(session.model_dimensions().is_none());
}

#[test]
fn dispose_before_load_completes_is_safe() {
    let mut session = session_with(ViewerConfig::default());
    let ticket = session.begin_load("slow.stl").unwrap();
    assert!(session.dispose());
    assert!(!session.finish_load(ticket, Ok(cube_model(10.0))));
    assert!(session.drain_events().is_empty());
}

#[test]
fn dispose_releases_every_overlay_node() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    session.toggle_measurement();
    click(&mut session, CENTER.0, CENTER.1);
    click(&mut session, CENTER.0 + 20.0, CENTER.1);
    let spawned = session.scene().overlay().len();

    session.dispose();
    assert_eq!(session.scene_mut().overlay_mut().drain_released().len(), spawned);
}
