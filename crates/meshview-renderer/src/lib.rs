pub mod camera;
pub mod mesh;
pub mod orbit;
pub mod overlay;
pub mod picking;
pub mod scene;
pub mod session;
pub mod snapshot;

pub use camera::{Camera, CameraUniform};
pub use mesh::{Mesh, Vertex};
pub use orbit::{DragMode, OrbitControls, Spherical};
pub use overlay::{LabelVertex, OverlayVertex, billboard_vertices, node_vertices};
pub use picking::{AABB, Ray};
pub use scene::{Scene, ScenePick};
pub use session::{PointerButton, ViewerSession};
pub use snapshot::{CaptureError, encode_png};

// Re-export glam types for consistent version usage
pub use glam;

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec3;
    use meshview_core::MeshModel;

    /// 原点を角とする一辺 `size` mmの立方体
    pub fn cube_model(size: f32) -> MeshModel {
        let positions = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 != 0 { size } else { 0.0 },
                    if i & 2 != 0 { size } else { 0.0 },
                    if i & 4 != 0 { size } else { 0.0 },
                )
            })
            .collect();
        let indices = vec![
            0, 2, 1, 1, 2, 3, 4, 5, 6, 5, 7, 6, 0, 1, 4, 1, 5, 4, 2, 6, 3, 3, 6, 7, 0, 4, 2, 2, 4,
            6, 1, 3, 5, 3, 7, 5,
        ];
        MeshModel::from_indexed(positions, indices, 2.0).unwrap()
    }
}
