//! 読み込み済みメッシュモデルと派生メトリクス
//!
//! モデル座標はミリメートル。表示用には中心を原点に移動し、
//! 最大辺が `normalized_size` になるよう一様スケールする。

use std::io::Cursor;

use serde::{Deserialize, Serialize};

use crate::components::Transform;
use crate::error::LoadError;
use crate::math::{Mat4, Vec3};

/// 体積の補正係数（バウンディングボックス体積に掛ける経験値）
pub const VOLUME_CORRECTION: f32 = 0.8;

/// 軸平行バウンディングボックス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// 点群から計算。空ならNone
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }
}

/// モデル寸法（mm）と概算体積（mm³）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelDimensions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub volume: f32,
}

impl ModelDimensions {
    /// バウンディングボックスから寸法を求める。
    /// 体積は `width × height × depth × 0.8` の概算値で、実体積ではない。
    pub fn from_bounds(bounds: &BoundingBox) -> Self {
        let size = bounds.size();
        Self {
            width: size.x,
            height: size.y,
            depth: size.z,
            volume: size.x * size.y * size.z * VOLUME_CORRECTION,
        }
    }

    pub fn max_dimension(&self) -> f32 {
        self.width.max(self.height).max(self.depth)
    }
}

/// 読み込み済みメッシュ
#[derive(Debug, Clone)]
pub struct MeshModel {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: BoundingBox,
    center_offset: Vec3,
    scale_factor: f32,
    dimensions: ModelDimensions,
}

impl MeshModel {
    /// STLバイト列から構築（バイナリ/ASCIIは自動判別）
    pub fn from_stl_bytes(bytes: &[u8], normalized_size: f32) -> Result<Self, LoadError> {
        let mut cursor = Cursor::new(bytes);
        let stl = stl_io::read_stl(&mut cursor)?;

        if stl.faces.is_empty() {
            return Err(LoadError::EmptyMesh);
        }

        let positions: Vec<Vec3> = stl
            .vertices
            .iter()
            .map(|v| {
                let arr: [f32; 3] = (*v).into();
                Vec3::from_array(arr)
            })
            .collect();

        let indices: Vec<u32> = stl
            .faces
            .iter()
            .flat_map(|face| face.vertices.iter().map(|&idx| idx as u32))
            .collect();

        tracing::debug!(
            "Parsed STL: {} vertices, {} triangles",
            positions.len(),
            stl.faces.len()
        );

        Self::from_indexed(positions, indices, normalized_size)
    }

    /// 頂点とインデックスから構築
    pub fn from_indexed(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normalized_size: f32,
    ) -> Result<Self, LoadError> {
        if indices.is_empty() {
            return Err(LoadError::EmptyMesh);
        }
        if indices.len() % 3 != 0 {
            return Err(LoadError::IncompleteTriangle(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(LoadError::InvalidIndex {
                index,
                vertex_count: positions.len(),
            });
        }
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(LoadError::NonFinite);
        }

        let bounds =
            BoundingBox::from_points(positions.iter().copied()).ok_or(LoadError::EmptyMesh)?;
        let max_extent = bounds.max_extent();
        if max_extent <= f32::EPSILON {
            return Err(LoadError::ZeroExtent);
        }

        Ok(Self {
            center_offset: -bounds.center(),
            scale_factor: normalized_size / max_extent,
            dimensions: ModelDimensions::from_bounds(&bounds),
            positions,
            indices,
            bounds,
        })
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// モデル座標の三角形をイテレート
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn center_offset(&self) -> Vec3 {
        self.center_offset
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn dimensions(&self) -> ModelDimensions {
        self.dimensions
    }

    /// モデル座標(mm) → シーン座標
    pub fn to_scene(&self, point: Vec3) -> Vec3 {
        (point + self.center_offset) * self.scale_factor
    }

    /// シーン座標 → モデル座標(mm)
    pub fn to_model(&self, point: Vec3) -> Vec3 {
        point / self.scale_factor - self.center_offset
    }

    /// メッシュノードのTransform
    pub fn transform(&self) -> Transform {
        Transform::from_scale_translation(self.scale_factor, self.center_offset * self.scale_factor)
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform().to_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cuboid(size: Vec3, origin: Vec3) -> (Vec<Vec3>, Vec<u32>) {
        let positions = (0..8)
            .map(|i| {
                origin
                    + Vec3::new(
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
        (positions, indices)
    }

    fn write_stl(positions: &[Vec3], indices: &[u32]) -> Vec<u8> {
        let triangles: Vec<stl_io::Triangle> = indices
            .chunks_exact(3)
            .map(|tri| stl_io::Triangle {
                normal: stl_io::Normal::new([0.0, 0.0, 0.0]),
                vertices: [
                    stl_io::Vertex::new(positions[tri[0] as usize].to_array()),
                    stl_io::Vertex::new(positions[tri[1] as usize].to_array()),
                    stl_io::Vertex::new(positions[tri[2] as usize].to_array()),
                ],
            })
            .collect();
        let mut bytes = Vec::new();
        stl_io::write_stl(&mut bytes, triangles.iter()).unwrap();
        bytes
    }

    #[test]
    fn test_cube_dimensions_and_volume() {
        let (positions, indices) = cuboid(Vec3::splat(10.0), Vec3::ZERO);
        let model = MeshModel::from_indexed(positions, indices, 2.0).unwrap();
        let dims = model.dimensions();

        assert_eq!(dims.width, 10.0);
        assert_eq!(dims.height, 10.0);
        assert_eq!(dims.depth, 10.0);
        assert!((dims.volume - 800.0).abs() < 1e-3);
        assert!((model.scale_factor() - 0.2).abs() < 1e-6);
        assert_eq!(model.triangle_count(), 12);
    }

    #[test]
    fn test_geometry_is_centered() {
        let (positions, indices) = cuboid(Vec3::new(4.0, 2.0, 8.0), Vec3::new(100.0, -50.0, 7.0));
        let model = MeshModel::from_indexed(positions, indices, 2.0).unwrap();

        let scene_bounds =
            BoundingBox::from_points(model.positions().iter().map(|&p| model.to_scene(p))).unwrap();
        assert!(scene_bounds.center().length() < 1e-5);
        assert!((scene_bounds.max_extent() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_matches_to_scene() {
        let (positions, indices) = cuboid(Vec3::new(3.0, 5.0, 7.0), Vec3::new(1.0, 2.0, 3.0));
        let model = MeshModel::from_indexed(positions, indices, 2.0).unwrap();
        let p = Vec3::new(2.5, 4.0, 9.0);

        let via_transform = model.transform().transform_point(p);
        assert!((via_transform - model.to_scene(p)).length() < 1e-5);
        assert!((model.to_model(model.to_scene(p)) - p).length() < 1e-4);
    }

    #[test]
    fn test_from_stl_bytes() {
        let (positions, indices) = cuboid(Vec3::splat(10.0), Vec3::ZERO);
        let bytes = write_stl(&positions, &indices);
        let model = MeshModel::from_stl_bytes(&bytes, 2.0).unwrap();

        assert_eq!(model.triangle_count(), 12);
        // STLリーダーは重複頂点をまとめる
        assert_eq!(model.positions().len(), 8);
        assert_eq!(model.dimensions().width, 10.0);
    }

    #[test]
    fn test_truncated_stl_is_malformed() {
        let (positions, indices) = cuboid(Vec3::splat(10.0), Vec3::ZERO);
        let bytes = write_stl(&positions, &indices);
        let truncated = &bytes[..bytes.len() - 20];

        assert!(matches!(
            MeshModel::from_stl_bytes(truncated, 2.0),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_payload_is_malformed() {
        assert!(matches!(
            MeshModel::from_stl_bytes(&[], 2.0),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let result = MeshModel::from_indexed(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 3], 2.0);
        assert!(matches!(result, Err(LoadError::InvalidIndex { index: 3, .. })));
    }

    #[test]
    fn test_rejects_partial_triangle() {
        let result =
            MeshModel::from_indexed(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2, 0], 2.0);
        let err = result.unwrap_err();
        assert!(matches!(err, LoadError::IncompleteTriangle(4)));
        assert!(err.to_string().contains("not a whole number of triangles"));
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = MeshModel::from_indexed(
            vec![Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), Vec3::Y],
            vec![0, 1, 2],
            2.0,
        );
        assert!(matches!(result, Err(LoadError::NonFinite)));
    }

    #[test]
    fn test_rejects_zero_extent() {
        let p = Vec3::splat(1.0);
        let result = MeshModel::from_indexed(vec![p, p, p], vec![0, 1, 2], 2.0);
        assert!(matches!(result, Err(LoadError::ZeroExtent)));
    }

    proptest! {
        #[test]
        fn prop_max_dimension_scales_to_normalized_size(
            w in 0.1f32..500.0,
            h in 0.1f32..500.0,
            d in 0.1f32..500.0,
            normalized in 0.5f32..10.0,
        ) {
            let (positions, indices) = cuboid(Vec3::new(w, h, d), Vec3::new(-3.0, 11.0, 0.5));
            let model = MeshModel::from_indexed(positions, indices, normalized).unwrap();
            let scaled = model.dimensions().max_dimension() * model.scale_factor();
            prop_assert!((scaled - normalized).abs() <= normalized * 1e-5);
        }
    }
}
