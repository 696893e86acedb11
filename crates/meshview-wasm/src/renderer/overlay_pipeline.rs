//! オーバーレイ描画パイプラインモジュール
//!
//! 計測マーカー、ハロー、線の描画パイプライン

use wgpu::util::DeviceExt;

use super::depth::DEPTH_FORMAT;
use crate::shaders;

use meshview_core::OverlayNode;
use meshview_renderer::{node_vertices, OverlayVertex};

/// オーバーレイ描画パイプライン
pub struct OverlayPipeline {
    pub pipeline: wgpu::RenderPipeline,
}

impl OverlayPipeline {
    /// 新しいオーバーレイパイプラインを作成
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::OVERLAY_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        // 深度テストはするが書き込まない（半透明のハローを重ねるため）
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[OverlayVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // 両面描画
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        Self { pipeline }
    }

    pub fn draw<'b>(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        nodes: impl IntoIterator<Item = &'b OverlayBuffers>,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);
        for node in nodes {
            pass.set_vertex_buffer(0, node.vertex_buffer.slice(..));
            pass.draw(0..node.vertex_count, 0..1);
        }
    }
}

/// オーバーレイノード1つ分の頂点バッファ
pub struct OverlayBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    /// 半透明（ハロー）は不透明ノードの後に描く
    pub translucent: bool,
}

impl OverlayBuffers {
    /// ジオメトリを持たないノード（ラベル）はNone
    pub fn new(device: &wgpu::Device, node: &OverlayNode) -> Option<Self> {
        let vertices = node_vertices(node);
        if vertices.is_empty() {
            return None;
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Some(Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            translucent: node.color[3] < 1.0,
        })
    }

    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
    }
}
