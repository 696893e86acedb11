//! シーングラフ
//!
//! カメラ、読み込み済みモデル、計測オーバーレイを保持する。
//! GPUリソースは持たず、wasm側のレンダラーが毎フレームこの状態を読む。

use glam::Vec3;
use meshview_core::{MeshModel, OverlayGroup, SurfaceHit, SurfacePicker, ViewerConfig};

use crate::camera::Camera;
use crate::orbit::OrbitControls;
use crate::picking::AABB;

/// シーンに配置されたモデルとピック用キャッシュ
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: MeshModel,
    /// シーン座標の頂点（ピック用）
    scene_positions: Vec<Vec3>,
    bounds: AABB,
}

impl LoadedModel {
    fn new(model: MeshModel) -> Self {
        let scene_positions: Vec<Vec3> =
            model.positions().iter().map(|&p| model.to_scene(p)).collect();
        let bounds = AABB::from_points(&scene_positions)
            .unwrap_or(AABB::new(Vec3::ZERO, Vec3::ZERO));
        Self {
            model,
            scene_positions,
            bounds,
        }
    }

    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }
}

/// ピック専用のシーンビュー
/// オーバーレイを可変借用したままピックできるように分離している
#[derive(Clone, Copy)]
pub struct ScenePick<'a> {
    camera: &'a Camera,
    viewport: (u32, u32),
    model: Option<&'a LoadedModel>,
}

impl SurfacePicker for ScenePick<'_> {
    fn pick_surface_point(&self, x: f32, y: f32) -> Option<SurfaceHit> {
        let loaded = self.model?;
        let (width, height) = self.viewport;
        let ray = self.camera.screen_to_ray(x, y, width as f32, height as f32);

        ray.intersect_aabb(&loaded.bounds)?;
        let t = ray.nearest_triangle_hit(&loaded.scene_positions, loaded.model.indices())?;

        let scene = ray.at(t);
        Some(SurfaceHit {
            scene,
            model: loaded.model.to_model(scene),
        })
    }
}

pub struct Scene {
    camera: Camera,
    controls: OrbitControls,
    model: Option<LoadedModel>,
    overlay: OverlayGroup,
    viewport: (u32, u32),
    /// モデルの差し替えごとに増える（GPUバッファ再生成の判定用）
    model_revision: u64,
}

impl Scene {
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        let viewport = (width.max(1), height.max(1));
        let mut scene = Self {
            camera: Camera::new(&config.camera, viewport.0 as f32 / viewport.1 as f32),
            controls: OrbitControls::new(config.camera.clone()),
            model: None,
            overlay: OverlayGroup::new(),
            viewport,
            model_revision: 0,
        };
        scene.sync_camera();
        scene
    }

    // ========================================================================
    // モデル
    // ========================================================================

    pub fn set_model(&mut self, model: MeshModel) {
        self.model = Some(LoadedModel::new(model));
        self.model_revision += 1;
    }

    /// モデルを外す。外すものがあった場合true
    pub fn clear_model(&mut self) -> bool {
        if self.model.take().is_some() {
            self.model_revision += 1;
            true
        } else {
            false
        }
    }

    pub fn model(&self) -> Option<&MeshModel> {
        self.model.as_ref().map(|loaded| &loaded.model)
    }

    pub fn loaded_model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn model_revision(&self) -> u64 {
        self.model_revision
    }

    // ========================================================================
    // カメラ / ビューポート
    // ========================================================================

    /// サイズ0は無視する。変化があった場合true
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == self.viewport {
            return false;
        }
        self.viewport = (width, height);
        self.camera.set_aspect(width as f32 / height as f32);
        true
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// コントローラの表示値をカメラへ反映
    pub fn sync_camera(&mut self) {
        self.controls.apply(&mut self.camera);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    // ========================================================================
    // オーバーレイ / ピック
    // ========================================================================

    pub fn overlay(&self) -> &OverlayGroup {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayGroup {
        &mut self.overlay
    }

    pub fn picker(&self) -> ScenePick<'_> {
        ScenePick {
            camera: &self.camera,
            viewport: self.viewport,
            model: self.model.as_ref(),
        }
    }

    /// ピック用ビューとオーバーレイを同時に借りる
    pub fn split_for_pick(&mut self) -> (ScenePick<'_>, &mut OverlayGroup) {
        (
            ScenePick {
                camera: &self.camera,
                viewport: self.viewport,
                model: self.model.as_ref(),
            },
            &mut self.overlay,
        )
    }
}

impl SurfacePicker for Scene {
    fn pick_surface_point(&self, x: f32, y: f32) -> Option<SurfaceHit> {
        self.picker().pick_surface_point(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::cube_model;

    fn scene_with_cube() -> Scene {
        let config = ViewerConfig::default();
        let mut scene = Scene::new(&config, 800, 600);
        scene.set_model(cube_model(10.0));
        scene
    }

    #[test]
    fn test_center_pick_hits_front_face() {
        let mut scene = scene_with_cube();
        scene.controls_mut().reset();
        scene.sync_camera();

        let hit = scene.pick_surface_point(400.0, 300.0).unwrap();
        // 中心を通るレイは立方体の表面上（いずれかの座標が0か10）に当たる
        let on_face = hit
            .model
            .to_array()
            .iter()
            .any(|c| c.abs() < 1e-3 || (c - 10.0).abs() < 1e-3);
        assert!(on_face, "hit {:?} is not on a face", hit.model);
        assert!((scene.model().unwrap().to_scene(hit.model) - hit.scene).length() < 1e-4);
    }

    #[test]
    fn test_corner_pick_misses() {
        let scene = scene_with_cube();
        assert!(scene.pick_surface_point(1.0, 1.0).is_none());
    }

    #[test]
    fn test_pick_without_model_misses() {
        let scene = Scene::new(&ViewerConfig::default(), 800, 600);
        assert!(scene.pick_surface_point(400.0, 300.0).is_none());
    }

    #[test]
    fn test_resize_ignores_zero() {
        let mut scene = scene_with_cube();
        assert!(!scene.resize(0, 100));
        assert!(scene.resize(1024, 512));
        assert_eq!(scene.viewport(), (1024, 512));
        assert_eq!(scene.camera().aspect, 2.0);
        assert!(!scene.resize(1024, 512));
    }

    #[test]
    fn test_model_revision_tracks_swaps() {
        let mut scene = Scene::new(&ViewerConfig::default(), 800, 600);
        assert!(!scene.clear_model());
        scene.set_model(cube_model(1.0));
        assert!(scene.clear_model());
        assert_eq!(scene.model_revision(), 2);
    }
}
