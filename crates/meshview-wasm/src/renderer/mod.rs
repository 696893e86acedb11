//! Rendererモジュール
//!
//! シーンの状態をGPUリソースへ反映し、WebGPUで描画する

mod capture;
mod depth;
mod gpu_context;
mod label_pipeline;
mod overlay_pipeline;
mod scene_pipeline;

use std::collections::HashMap;

use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use meshview_core::{ModelUniform, NodeId, OverlayKind, ViewerConfig};
use meshview_renderer::{CaptureError, Scene};

use crate::label_texture::rasterize_label;
use capture::{CaptureTarget, PendingCapture};
use gpu_context::GpuContext;
use label_pipeline::{LabelBuffers, LabelPipeline};
use overlay_pipeline::{OverlayBuffers, OverlayPipeline};
use scene_pipeline::{MeshBuffers, ScenePipeline};

/// Renderer構造体
/// GPUリソースを所有する唯一の場所。`destroy()` で明示的に解放する
pub struct Renderer {
    ctx: GpuContext,
    scene: ScenePipeline,
    overlay: OverlayPipeline,
    labels: LabelPipeline,

    // Depth buffer
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    // スクリーンショット用（サイズはサーフェスと同じ）
    capture: CaptureTarget,

    // シーン由来のリソース
    mesh: Option<MeshBuffers>,
    mesh_revision: u64,
    overlay_nodes: HashMap<NodeId, OverlayBuffers>,
    label_nodes: HashMap<NodeId, LabelBuffers>,

    clear_color: wgpu::Color,
    model_color: [f32; 3],
}

impl Renderer {
    /// 新しいRendererを作成（非同期）
    pub async fn create(canvas: HtmlCanvasElement, config: &ViewerConfig) -> Result<Renderer, JsValue> {
        let ctx = GpuContext::new(canvas).await?;
        let format = ctx.format();

        let scene = ScenePipeline::new(&ctx.device, format);
        let overlay = OverlayPipeline::new(&ctx.device, format, &scene.camera_bind_group_layout);
        let labels = LabelPipeline::new(&ctx.device, format, &scene.camera_bind_group_layout);

        let (depth_texture, depth_view) =
            depth::create_texture(&ctx.device, ctx.width(), ctx.height());
        let capture = CaptureTarget::new(&ctx.device, format, ctx.width(), ctx.height());

        let [r, g, b, a] = config.background;

        tracing::info!("Renderer initialized successfully");

        Ok(Self {
            ctx,
            scene,
            overlay,
            labels,
            depth_texture,
            depth_view,
            capture,
            mesh: None,
            mesh_revision: 0,
            overlay_nodes: HashMap::new(),
            label_nodes: HashMap::new(),
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            },
            model_color: config.model_color,
        })
    }

    // ========================================================================
    // シーン同期
    // ========================================================================

    /// シーンの変更をGPUリソースへ反映する
    /// 解放済みノードのリソースはここで破棄する
    pub fn sync(&mut self, scene: &mut Scene) {
        let (width, height) = scene.viewport();
        if (width, height) != self.ctx.size {
            self.resize(width, height);
        }

        self.sync_mesh(scene);

        for id in scene.overlay_mut().drain_released() {
            if let Some(buffers) = self.overlay_nodes.remove(&id) {
                buffers.destroy();
            }
            if let Some(label) = self.label_nodes.remove(&id) {
                label.destroy();
            }
        }

        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        for (id, node) in scene.overlay().iter() {
            match &node.kind {
                OverlayKind::Label { label, height } => {
                    let stale = self
                        .label_nodes
                        .get(&id)
                        .is_none_or(|cached| cached.text != label.as_str());
                    if !stale {
                        continue;
                    }
                    match rasterize_label(label.as_str(), node.color) {
                        Ok(bitmap) => {
                            let buffers = LabelBuffers::new(
                                device,
                                queue,
                                &self.labels,
                                &bitmap,
                                label.as_str(),
                                node.position(),
                                *height,
                            );
                            if let Some(old) = self.label_nodes.insert(id, buffers) {
                                old.destroy();
                            }
                        }
                        Err(err) => tracing::warn!("Failed to rasterize label: {:?}", err),
                    }
                }
                _ => {
                    if self.overlay_nodes.contains_key(&id) {
                        continue;
                    }
                    if let Some(buffers) = OverlayBuffers::new(device, node) {
                        self.overlay_nodes.insert(id, buffers);
                    }
                }
            }
        }
    }

    fn sync_mesh(&mut self, scene: &Scene) {
        if scene.model_revision() == self.mesh_revision {
            return;
        }
        self.mesh_revision = scene.model_revision();

        if let Some(old) = self.mesh.take() {
            old.destroy();
        }
        if let Some(model) = scene.model() {
            self.mesh = Some(MeshBuffers::new(&self.ctx.device, model, self.model_color));
            self.scene
                .write_model(&self.ctx.queue, &ModelUniform::from_matrix(model.model_matrix()));
            tracing::debug!("Uploaded mesh with {} triangles", model.triangle_count());
        }
    }

    /// Canvas サイズ変更
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);

            // Depth Texture再作成
            self.depth_texture.destroy();
            let (depth_texture, depth_view) = depth::create_texture(&self.ctx.device, width, height);
            self.depth_texture = depth_texture;
            self.depth_view = depth_view;

            self.capture.destroy();
            self.capture = CaptureTarget::new(&self.ctx.device, self.ctx.format(), width, height);

            tracing::debug!("Resized to {}x{}", width, height);
        }
    }

    // ========================================================================
    // 描画
    // ========================================================================

    /// カメラ・ラベルの向きを更新（描画パスの前）
    fn prepare(&self, scene: &Scene) {
        let camera = scene.camera();
        self.scene.write_camera(&self.ctx.queue, &camera.uniform());

        let (right, up) = (camera.right(), camera.screen_up());
        for label in self.label_nodes.values() {
            label.face_camera(&self.ctx.queue, right, up);
        }
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if let Some(mesh) = &self.mesh {
            self.scene.draw(&mut render_pass, mesh);
        }

        // 不透明 → 半透明の順
        let opaque = self.overlay_nodes.values().filter(|n| !n.translucent);
        let translucent = self.overlay_nodes.values().filter(|n| n.translucent);
        self.overlay.draw(
            &mut render_pass,
            &self.scene.camera_bind_group,
            opaque.chain(translucent),
        );

        self.labels.draw(
            &mut render_pass,
            &self.scene.camera_bind_group,
            self.label_nodes.values(),
        );
    }

    /// 1フレーム描画してサーフェスへ表示
    pub fn render(&mut self, scene: &mut Scene) -> Result<(), JsValue> {
        self.sync(scene);
        self.prepare(scene);

        let output = match self.ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // 次のフレームで再取得する
                self.ctx.surface.configure(&self.ctx.device, &self.ctx.config);
                return Ok(());
            }
            Err(e) => {
                return Err(JsValue::from_str(&format!(
                    "Failed to get surface texture: {:?}",
                    e
                )));
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.encode_pass(&mut encoder, &view, &self.depth_view);

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// 現在の状態をオフスクリーンへ描き、読み出しを開始する
    /// 表示中のフレームと同じ内容になる
    pub fn capture(&mut self, scene: &mut Scene) -> Result<PendingCapture, CaptureError> {
        let (width, height) = self.ctx.size;
        if width == 0 || height == 0 {
            return Err(CaptureError::NotReady);
        }

        self.sync(scene);
        self.prepare(scene);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });

        self.encode_pass(&mut encoder, &self.capture.view, &self.capture.depth_view);
        let pending = self.capture.encode_readback(&self.ctx.device, &mut encoder);

        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        Ok(pending)
    }

    // ========================================================================
    // 破棄
    // ========================================================================

    /// 全GPUリソースを解放する
    pub fn destroy(&mut self) {
        if let Some(mesh) = self.mesh.take() {
            mesh.destroy();
        }
        for (_, buffers) in self.overlay_nodes.drain() {
            buffers.destroy();
        }
        for (_, label) in self.label_nodes.drain() {
            label.destroy();
        }
        self.scene.destroy();
        self.depth_texture.destroy();
        self.capture.destroy();
        self.ctx.device.destroy();
        tracing::info!("Renderer resources released");
    }

    pub fn width(&self) -> u32 {
        self.ctx.width()
    }

    pub fn height(&self) -> u32 {
        self.ctx.height()
    }
}
