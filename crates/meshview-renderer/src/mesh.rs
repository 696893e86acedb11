use bytemuck::{Pod, Zeroable};
use meshview_core::MeshModel;
use wgpu::{VertexBufferLayout, VertexAttribute, VertexFormat, VertexStepMode, BufferAddress};

/// 頂点構造体
/// 位置、法線、色を含む
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    /// 新しい頂点を作成
    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, normal, color }
    }

    /// 頂点バッファレイアウトを取得
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                // position
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x3,
                },
                // normal
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as BufferAddress,
                    shader_location: 1,
                    format: VertexFormat::Float32x3,
                },
                // color
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as BufferAddress,
                    shader_location: 2,
                    format: VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// メッシュ構造体
/// 頂点とインデックスを含む
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// 空のメッシュを作成
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// 読み込んだモデルからフラットシェーディング用メッシュを生成
    /// 座標はモデル座標（mm）のまま。正規化はモデル行列で行う
    pub fn from_model(model: &MeshModel, color: [f32; 3]) -> Self {
        let mut vertices = Vec::with_capacity(model.triangle_count() * 3);
        for [a, b, c] in model.triangles() {
            let normal = (b - a).cross(c - a).normalize_or_zero().to_array();
            for p in [a, b, c] {
                vertices.push(Vertex::new(p.to_array(), normal, color));
            }
        }
        let indices = (0..vertices.len() as u32).collect();
        Self { vertices, indices }
    }

    /// 頂点数を取得
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// インデックス数を取得
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_new() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        assert_eq!(v.color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vertex_size() {
        // 3 floats * 3 attributes * 4 bytes = 36 bytes
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
    }

    #[test]
    fn test_from_model_uses_flat_normals() {
        use glam::Vec3;

        let model = MeshModel::from_indexed(
            vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 0.0, 10.0)],
            vec![0, 1, 2, 0, 3, 1],
            2.0,
        )
        .unwrap();
        let mesh = Mesh::from_model(&model, [0.5, 0.5, 0.5]);

        // 三角形ごとに頂点を複製
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[3].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[1].position, [10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.index_count(), 0);
    }
}
