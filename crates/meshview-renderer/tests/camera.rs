mod common;

use common::*;
use meshview_core::{ViewerConfig, ViewerEvent};
use meshview_renderer::PointerButton;

#[test]
fn reset_mid_drag_restores_exact_defaults() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    let defaults = session.view_angles().unwrap();

    session.pointer_down(PointerButton::Primary, 100.0, 100.0);
    session.pointer_move(180.0, 140.0);
    for _ in 0..3 {
        session.frame();
    }
    session.pointer_move(260.0, 160.0);
    session.frame();
    assert_ne!(session.view_angles().unwrap(), defaults);

    session.reset_view();
    assert_eq!(session.view_angles().unwrap(), defaults);
    assert!(!session.is_dragging());

    // 同じジェスチャーの続きはカメラを動かさない
    session.pointer_move(400.0, 300.0);
    assert_eq!(session.pointer_up(400.0, 300.0), None);
    for _ in 0..10 {
        session.frame();
    }
    assert_eq!(session.view_angles().unwrap(), defaults);

    let events = session.drain_events();
    assert_eq!(
        events.last(),
        Some(&ViewerEvent::ViewAnglesChanged(defaults))
    );
}

#[test]
fn settled_change_emitted_once_per_gesture() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));

    session.pointer_down(PointerButton::Primary, 0.0, 0.0);
    for step in 1..=10 {
        session.pointer_move(step as f32 * 10.0, 0.0);
        session.frame();
    }
    session.pointer_up(100.0, 0.0);
    run_until_settled(&mut session);
    for _ in 0..100 {
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
fn wheel_zoom_respects_radius_limits() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    let camera = session.config().camera.clone();

    session.wheel(1e6);
    run_until_settled(&mut session);
    assert_eq!(session.view_angles().unwrap().radius, camera.max_radius);

    session.wheel(-1e6);
    run_until_settled(&mut session);
    assert_eq!(session.view_angles().unwrap().radius, camera.min_radius);
}

#[test]
fn secondary_drag_pans_without_changing_angles() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    let before = session.view_angles().unwrap();

    session.pointer_down(PointerButton::Secondary, 300.0, 300.0);
    session.pointer_move(360.0, 330.0);
    session.pointer_up(360.0, 330.0);
    run_until_settled(&mut session);

    assert_eq!(session.view_angles().unwrap(), before);
    assert!(session.scene().controls().target().length() > 0.0);

    session.reset_view();
    assert_eq!(session.scene().controls().target(), glam::Vec3::ZERO);
}

#[test]
fn resize_updates_aspect_and_ignores_zero() {
    let mut session = loaded_session(ViewerConfig::default(), cube_model(10.0));
    assert!(session.resize(1200, 400));
    assert_eq!(session.scene().camera().aspect, 3.0);
    assert!(!session.resize(0, 0));
    assert_eq!(session.scene().viewport(), (1200, 400));
}
