//! オービットカメラ制御
//!
//! 入力はゴール値だけを動かし、表示値は `update()` ごとに
//! 残差の `damping_factor` 分だけゴールへ近づく（フレーム単位、時間非依存）。

use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};
use meshview_core::{CameraConfig, ViewAngles};

use crate::camera::Camera;

/// 仰角の上限（真上/真下で視線とupが平行になるのを避ける）
pub const MAX_ELEVATION: f32 = FRAC_PI_2 - 0.01;

/// これ未満の差はゴール到達とみなす
pub const SETTLE_EPSILON: f32 = 1e-4;

/// 球面座標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub azimuth: f32,
    pub elevation: f32,
    pub radius: f32,
}

impl Spherical {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            azimuth: config.azimuth,
            elevation: config.elevation.clamp(-MAX_ELEVATION, MAX_ELEVATION),
            radius: config.radius,
        }
    }

    /// 注視点からカメラへのオフセット
    pub fn to_offset(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.radius
    }

    pub fn angles(&self) -> ViewAngles {
        ViewAngles {
            azimuth: self.azimuth,
            elevation: self.elevation,
            radius: self.radius,
        }
    }

    fn approach(&mut self, goal: &Spherical, factor: f32) {
        self.azimuth += (goal.azimuth - self.azimuth) * factor;
        self.elevation += (goal.elevation - self.elevation) * factor;
        self.radius += (goal.radius - self.radius) * factor;
    }

    fn max_gap(&self, goal: &Spherical) -> f32 {
        (goal.azimuth - self.azimuth)
            .abs()
            .max((goal.elevation - self.elevation).abs())
            .max((goal.radius - self.radius).abs())
    }
}

/// ドラッグ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    mode: DragMode,
    last: Vec2,
}

/// オービットカメラコントローラ
/// カメラ状態の唯一の書き込み元
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: CameraConfig,
    live: Spherical,
    goal: Spherical,
    target: Vec3,
    goal_target: Vec3,
    drag: Option<DragState>,
    settled: bool,
}

impl OrbitControls {
    pub fn new(config: CameraConfig) -> Self {
        let defaults = Spherical::from_config(&config);
        Self {
            config,
            live: defaults,
            goal: defaults,
            target: Vec3::ZERO,
            goal_target: Vec3::ZERO,
            drag: None,
            settled: true,
        }
    }

    // ========================================================================
    // 入力
    // ========================================================================

    pub fn begin_drag(&mut self, mode: DragMode, position: Vec2) {
        self.drag = Some(DragState {
            mode,
            last: position,
        });
    }

    /// ドラッグ中のポインタ移動。ドラッグしていなければ何もしない
    pub fn drag_to(&mut self, position: Vec2) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let delta = position - drag.last;
        drag.last = position;
        let mode = drag.mode;

        match mode {
            DragMode::Rotate => self.rotate(delta),
            DragMode::Pan => self.pan(delta),
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// ピクセル移動量を方位角/仰角へ
    pub fn rotate(&mut self, delta: Vec2) {
        let speed = self.config.rotate_speed;
        self.goal.azimuth -= delta.x * speed;
        self.goal.elevation =
            (self.goal.elevation + delta.y * speed).clamp(-MAX_ELEVATION, MAX_ELEVATION);
        self.settled = false;
    }

    /// カメラ平面内で注視点を移動
    pub fn pan(&mut self, delta: Vec2) {
        let forward = -self.goal.to_offset().normalize_or(Vec3::Z);
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);
        let scale = self.config.pan_speed * self.goal.radius;

        self.goal_target += (-right * delta.x + up * delta.y) * scale;
        self.settled = false;
    }

    /// ホイール（deltaY）によるズーム
    pub fn zoom(&mut self, delta: f32) {
        let radius = self.goal.radius * (delta * self.config.zoom_speed).exp();
        self.goal.radius = radius.clamp(self.config.min_radius, self.config.max_radius);
        self.settled = false;
    }

    /// 既定値へ即座に戻す（減衰なし）。ドラッグ中なら中断する
    pub fn reset(&mut self) -> ViewAngles {
        let defaults = Spherical::from_config(&self.config);
        self.live = defaults;
        self.goal = defaults;
        self.target = Vec3::ZERO;
        self.goal_target = Vec3::ZERO;
        self.drag = None;
        self.settled = true;
        defaults.angles()
    }

    // ========================================================================
    // フレーム更新
    // ========================================================================

    /// 1フレーム分の減衰を適用。
    /// ゴールに到達してスナップしたフレームでのみ静止後の角度を返す
    pub fn update(&mut self) -> Option<ViewAngles> {
        if self.settled {
            return None;
        }

        let factor = self.config.damping_factor;
        self.live.approach(&self.goal, factor);
        self.target += (self.goal_target - self.target) * factor;

        let gap = self
            .live
            .max_gap(&self.goal)
            .max((self.goal_target - self.target).abs().max_element());
        if gap < SETTLE_EPSILON {
            self.live = self.goal;
            self.target = self.goal_target;
            self.settled = true;
            return Some(self.live.angles());
        }
        None
    }

    /// 表示中の角度
    pub fn angles(&self) -> ViewAngles {
        self.live.angles()
    }

    pub fn live(&self) -> Spherical {
        self.live
    }

    pub fn goal(&self) -> Spherical {
        self.goal
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn eye_position(&self) -> Vec3 {
        self.target + self.live.to_offset()
    }

    /// カメラへ反映
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.eye_position();
        camera.target = self.target;
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}
