//! 計測オーバーレイのジオメトリ生成
//! マーカー（球）、ハロー、線、ラベル用ビルボード

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use meshview_core::{OverlayKind, OverlayNode};

/// オーバーレイ頂点データ（シーン空間、モデル行列なし）
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl OverlayVertex {
    pub fn new(position: Vec3, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }

    /// 頂点バッファレイアウト
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// ラベル用頂点（テクスチャ付きクアッド）
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LabelVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl LabelVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LabelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

const SPHERE_RINGS: u32 = 10;
const SPHERE_SEGMENTS: u32 = 16;

// ========================================================================
// メッシュ生成関数
// ========================================================================

/// ノード1つ分の頂点（三角形リスト）。ラベルはテクスチャで描くので空
pub fn node_vertices(node: &OverlayNode) -> Vec<OverlayVertex> {
    let center = node.position();
    match &node.kind {
        OverlayKind::Marker { radius } | OverlayKind::Halo { radius } => {
            create_sphere_vertices(center, *radius, node.color)
        }
        OverlayKind::Line { start, end, width } => {
            create_line_vertices(*start, *end, *width, node.color)
        }
        OverlayKind::Label { .. } => Vec::new(),
    }
}

/// UV球
pub fn create_sphere_vertices(center: Vec3, radius: f32, color: [f32; 4]) -> Vec<OverlayVertex> {
    let point = |ring: u32, segment: u32| {
        let theta = ring as f32 / SPHERE_RINGS as f32 * PI;
        let phi = segment as f32 / SPHERE_SEGMENTS as f32 * TAU;
        center + Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()) * radius
    };

    let mut vertices = Vec::with_capacity((SPHERE_RINGS * SPHERE_SEGMENTS * 6) as usize);
    for ring in 0..SPHERE_RINGS {
        for segment in 0..SPHERE_SEGMENTS {
            let p00 = point(ring, segment);
            let p01 = point(ring, segment + 1);
            let p10 = point(ring + 1, segment);
            let p11 = point(ring + 1, segment + 1);

            for p in [p00, p10, p11, p00, p11, p01] {
                vertices.push(OverlayVertex::new(p, color));
            }
        }
    }
    vertices
}

/// 2点を結ぶ四角柱（どの方向から見ても幅が出るように）
pub fn create_line_vertices(start: Vec3, end: Vec3, width: f32, color: [f32; 4]) -> Vec<OverlayVertex> {
    let dir = end - start;
    if dir.length_squared() < f32::EPSILON {
        return Vec::new();
    }
    let dir = dir.normalize();
    let helper = if dir.dot(Vec3::Y).abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let right = dir.cross(helper).normalize() * width * 0.5;
    let up = right.cross(dir).normalize() * width * 0.5;

    let corners = [up + right, up - right, -up - right, -up + right];
    let mut vertices = Vec::with_capacity(24);
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        for p in [start + a, start + b, end + b, start + a, end + b, end + a] {
            vertices.push(OverlayVertex::new(p, color));
        }
    }
    vertices
}

/// カメラに正対するクアッド
/// `right` / `up` はカメラの画面軸（正規化済み）
pub fn billboard_vertices(
    anchor: Vec3,
    right: Vec3,
    up: Vec3,
    width: f32,
    height: f32,
) -> [LabelVertex; 6] {
    let half_w = right * width * 0.5;
    let half_h = up * height * 0.5;
    let v = |p: Vec3, uv: [f32; 2]| LabelVertex {
        position: p.to_array(),
        uv,
    };

    let bl = v(anchor - half_w - half_h, [0.0, 1.0]);
    let br = v(anchor + half_w - half_h, [1.0, 1.0]);
    let tr = v(anchor + half_w + half_h, [1.0, 0.0]);
    let tl = v(anchor - half_w + half_h, [0.0, 0.0]);
    [bl, br, tr, bl, tr, tl]
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    #[test]
    fn test_vertex_size() {
        // 3 + 4 floats
        assert_eq!(std::mem::size_of::<OverlayVertex>(), 28);
        assert_eq!(std::mem::size_of::<LabelVertex>(), 20);
    }

    #[test]
    fn test_sphere_vertices_lie_on_surface() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let vertices = create_sphere_vertices(center, 0.5, RED);

        assert_eq!(vertices.len() % 3, 0);
        for v in &vertices {
            let d = Vec3::from_array(v.position).distance(center);
            assert!((d - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_line_stays_within_width() {
        let vertices = create_line_vertices(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 0.1, RED);
        assert_eq!(vertices.len(), 24);
        for v in &vertices {
            let p = Vec3::from_array(v.position);
            assert!(p.z == 0.0 || (p.z - 2.0).abs() < 1e-6);
            assert!(Vec3::new(p.x, p.y, 0.0).length() <= 0.05 * 2f32.sqrt() + 1e-6);
        }
    }

    #[test]
    fn test_vertical_line_does_not_degenerate() {
        let vertices = create_line_vertices(Vec3::ZERO, Vec3::Y, 0.1, RED);
        assert!(vertices.iter().all(|v| v.position.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_zero_length_line_is_empty() {
        assert!(create_line_vertices(Vec3::ONE, Vec3::ONE, 0.1, RED).is_empty());
    }

    #[test]
    fn test_label_node_has_no_geometry() {
        let node = OverlayNode::label(Vec3::ZERO, "1.00 mm", 0.1, RED);
        assert!(node_vertices(&node).is_empty());
        let marker = OverlayNode::marker(Vec3::ZERO, 0.1, RED);
        assert!(!node_vertices(&marker).is_empty());
    }

    #[test]
    fn test_billboard_is_centered_on_anchor() {
        let anchor = Vec3::new(0.0, 1.0, 0.0);
        let quad = billboard_vertices(anchor, Vec3::X, Vec3::Y, 2.0, 1.0);
        let sum: Vec3 = [quad[0], quad[1], quad[2], quad[5]]
            .iter()
            .map(|v| Vec3::from_array(v.position))
            .sum();
        assert!((sum / 4.0 - anchor).length() < 1e-6);
    }
}
