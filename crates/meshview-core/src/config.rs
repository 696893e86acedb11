//! ビューア設定
//!
//! JSからオブジェクトまたはJSONで渡される。全フィールドにデフォルト値あり。

use std::f32::consts::{FRAC_PI_4, FRAC_PI_6};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::units::UnitSystem;

/// オービットカメラ設定
/// 角度はラジアン、距離はシーン単位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    /// 初期/リセット時の方位角
    pub azimuth: f32,
    /// 初期/リセット時の仰角
    pub elevation: f32,
    /// 初期/リセット時の注視点からの距離
    pub radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// 1フレームあたりに詰める残差の割合
    pub damping_factor: f32,
    /// ドラッグ1pxあたりの回転量（ラジアン）
    pub rotate_speed: f32,
    /// ホイール1単位あたりのズーム指数
    pub zoom_speed: f32,
    /// ドラッグ1pxあたりのパン量（半径比）
    pub pan_speed: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            azimuth: FRAC_PI_4,
            elevation: FRAC_PI_6,
            radius: 5.0,
            min_radius: 1.0,
            max_radius: 20.0,
            damping_factor: 0.1,
            rotate_speed: 0.005,
            zoom_speed: 0.001,
            pan_speed: 0.001,
            fov_degrees: 45.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

/// 計測マーカーの見た目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerStyle {
    pub marker_radius: f32,
    pub halo_radius: f32,
    pub line_width: f32,
    pub label_height: f32,
    /// ラベルを線の中点からどれだけ浮かせるか（シーン単位）
    pub label_lift: f32,
    pub marker_color: [f32; 4],
    pub halo_color: [f32; 4],
    pub line_color: [f32; 4],
    pub label_color: [f32; 4],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            marker_radius: 0.025,
            halo_radius: 0.05,
            line_width: 0.008,
            label_height: 0.12,
            label_lift: 0.08,
            marker_color: [1.0, 0.35, 0.1, 1.0],
            halo_color: [1.0, 0.6, 0.2, 0.35],
            line_color: [1.0, 0.85, 0.2, 1.0],
            label_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub units: UnitSystem,
    pub camera: CameraConfig,
    /// 最大辺をこの大きさに正規化する（シーン単位）
    pub normalized_size: f32,
    /// `None` でタイムアウト無効
    pub load_timeout_ms: Option<u32>,
    /// これ未満の移動量のポインタ操作はクリック扱い
    pub click_tolerance_px: f32,
    pub markers: MarkerStyle,
    pub model_color: [f32; 3],
    pub background: [f32; 4],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            units: UnitSystem::default(),
            camera: CameraConfig::default(),
            normalized_size: 2.0,
            load_timeout_ms: Some(30_000),
            click_tolerance_px: 4.0,
            markers: MarkerStyle::default(),
            model_color: [0.62, 0.68, 0.76],
            background: [0.1, 0.11, 0.13, 1.0],
        }
    }
}

impl ViewerConfig {
    /// JSON文字列から読み込み、検証する
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 値の整合性を検証
    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        let invalid = |msg: String| Err(ViewerError::InvalidConfig(msg));

        if !(self.normalized_size > 0.0) {
            return invalid(format!("normalizedSize must be positive, got {}", self.normalized_size));
        }
        if !(camera.min_radius > 0.0) || camera.min_radius > camera.max_radius {
            return invalid(format!(
                "camera radius range [{}, {}] is invalid",
                camera.min_radius, camera.max_radius
            ));
        }
        if camera.radius < camera.min_radius || camera.radius > camera.max_radius {
            return invalid(format!(
                "default camera radius {} is outside [{}, {}]",
                camera.radius, camera.min_radius, camera.max_radius
            ));
        }
        if !(camera.damping_factor > 0.0 && camera.damping_factor <= 1.0) {
            return invalid(format!(
                "dampingFactor must be in (0, 1], got {}",
                camera.damping_factor
            ));
        }
        if !(camera.near > 0.0) || camera.near >= camera.far {
            return invalid(format!("near/far planes {}..{} are invalid", camera.near, camera.far));
        }
        if self.click_tolerance_px < 0.0 {
            return invalid("clickTolerancePx must not be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ViewerConfig::from_json(r#"{ "units": "in", "camera": { "radius": 8.0 } }"#)
            .unwrap();
        assert_eq!(config.units, UnitSystem::Inches);
        assert_eq!(config.camera.radius, 8.0);
        assert_eq!(config.camera.min_radius, CameraConfig::default().min_radius);
        assert_eq!(config.load_timeout_ms, Some(30_000));
    }

    #[test]
    fn test_null_timeout_disables_it() {
        let config = ViewerConfig::from_json(r#"{ "loadTimeoutMs": null }"#).unwrap();
        assert_eq!(config.load_timeout_ms, None);
    }

    #[test]
    fn test_rejects_inverted_radius_range() {
        let err = ViewerConfig::from_json(r#"{ "camera": { "minRadius": 10.0, "maxRadius": 2.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_damping() {
        let mut config = ViewerConfig::default();
        config.camera.damping_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            ViewerConfig::from_json("{ nope"),
            Err(ViewerError::ConfigJson(_))
        ));
    }
}
