//! スクリーンショット用オフスクリーン描画とリードバック
//!
//! サーフェスのテクスチャは表示後に読めないので、同じ内容を
//! COPY_SRC付きのテクスチャへ描き、ステージングバッファ経由で読み出す

use meshview_renderer::snapshot::{is_bgra, padded_bytes_per_row, unpad_rows};
use meshview_renderer::{encode_png, CaptureError};

use super::depth;

/// オフスクリーンの描画先
pub struct CaptureTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub size: (u32, u32),
}

impl CaptureTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let (depth_texture, depth_view) = depth::create_texture(device, width, height);

        Self {
            texture,
            view,
            depth_texture,
            depth_view,
            format,
            size: (width, height),
        }
    }

    /// 描画済みのテクスチャをステージングバッファへコピーするコマンドを積む
    pub fn encode_readback(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
    ) -> PendingCapture {
        let (width, height) = self.size;
        let padded = padded_bytes_per_row(width);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        PendingCapture {
            buffer,
            width,
            height,
            padded_bytes_per_row: padded,
            bgra: is_bgra(self.format),
        }
    }

    pub fn destroy(&self) {
        self.texture.destroy();
        self.depth_texture.destroy();
    }
}

/// コピー投入済み、マップ待ちのキャプチャ
pub struct PendingCapture {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    bgra: bool,
}

/// 読み出し結果
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PendingCapture {
    /// submit後に呼ぶ。マップ完了を待ってPNGへエンコードする
    pub async fn finish(self) -> Result<CapturedImage, CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });

        match rx.await {
            Ok(Ok(())) => {}
            _ => {
                self.buffer.destroy();
                return Err(CaptureError::BufferMapFailed);
            }
        }

        let pixels = {
            let mapped = self.buffer.slice(..).get_mapped_range();
            unpad_rows(&mapped, self.width, self.height, self.padded_bytes_per_row)
        };
        self.buffer.unmap();
        self.buffer.destroy();

        let png = encode_png(&pixels, self.width, self.height, self.bgra)?;
        Ok(CapturedImage {
            png,
            width: self.width,
            height: self.height,
        })
    }
}
