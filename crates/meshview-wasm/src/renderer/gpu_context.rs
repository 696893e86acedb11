//! GPUコンテキストモジュール
//!
//! WebGPUのDevice, Queue, Surfaceを管理

use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

/// GPUコンテキスト
/// WebGPUの基本リソースを保持
pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: (u32, u32),
}

impl GpuContext {
    /// 新しいGPUコンテキストを作成（非同期）
    pub async fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        tracing::info!("Initializing WebGPU...");

        // Canvas サイズ取得（canvas属性のwidth/heightを使用）
        let width = canvas.width();
        let height = canvas.height();
        tracing::debug!("Canvas size: {}x{}", width, height);

        // サイズが0の場合はエラー
        if width == 0 || height == 0 {
            return Err(JsValue::from_str(&format!(
                "Canvas size is invalid: {}x{}. Set canvas.width/height before initializing.",
                width, height
            )));
        }

        // WebGPUが使えなければWebGL2へ
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        // Surface 作成（wasm32ターゲット用）
        #[cfg(target_arch = "wasm32")]
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {:?}", e)))?;

        #[cfg(not(target_arch = "wasm32"))]
        let surface: wgpu::Surface<'static> = unreachable!("This code is only for wasm32 target");

        // Adapter 取得
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to find suitable adapter: {:?}", e)))?;

        tracing::info!("Adapter: {:?}", adapter.get_info());

        // Device & Queue 作成
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to create device: {:?}", e)))?;

        let config = surface_configuration(&surface.get_capabilities(&adapter), width, height)
            .map_err(|e| JsValue::from_str(&e))?;
        surface.configure(&device, &config);

        tracing::info!("Surface configured: {:?} {}x{}", config.format, width, height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size: (width, height),
        })
    }

    /// リサイズ
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// 幅を取得
    pub fn width(&self) -> u32 {
        self.size.0
    }

    /// 高さを取得
    pub fn height(&self) -> u32 {
        self.size.1
    }

    /// 描画先のカラーフォーマット
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

/// サーフェス設定を選ぶ
/// フォーマットは bgra8unorm（ブラウザ推奨）、alpha_mode は Opaque を優先
fn surface_configuration(
    caps: &wgpu::SurfaceCapabilities,
    width: u32,
    height: u32,
) -> Result<wgpu::SurfaceConfiguration, String> {
    let format = caps
        .formats
        .iter()
        .find(|f| **f == wgpu::TextureFormat::Bgra8Unorm)
        .or_else(|| caps.formats.first())
        .copied()
        .ok_or_else(|| "Surface reports no supported formats".to_string())?;

    let alpha_mode = if caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        wgpu::CompositeAlphaMode::Opaque
    } else {
        caps.alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto)
    };

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>, alpha_modes: Vec<wgpu::CompositeAlphaMode>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            alpha_modes,
            ..Default::default()
        }
    }

    #[test]
    fn test_prefers_bgra_and_opaque() {
        let caps = caps(
            vec![wgpu::TextureFormat::Rgba8Unorm, wgpu::TextureFormat::Bgra8Unorm],
            vec![wgpu::CompositeAlphaMode::PreMultiplied, wgpu::CompositeAlphaMode::Opaque],
        );
        let config = surface_configuration(&caps, 640, 480).unwrap();
        assert_eq!(config.format, wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(config.alpha_mode, wgpu::CompositeAlphaMode::Opaque);
        assert_eq!((config.width, config.height), (640, 480));
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let caps = caps(
            vec![wgpu::TextureFormat::Rgba8Unorm],
            vec![wgpu::CompositeAlphaMode::PreMultiplied],
        );
        let config = surface_configuration(&caps, 1, 1).unwrap();
        assert_eq!(config.format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(config.alpha_mode, wgpu::CompositeAlphaMode::PreMultiplied);
    }

    #[test]
    fn test_no_formats_is_an_error() {
        assert!(surface_configuration(&caps(vec![], vec![]), 1, 1).is_err());
    }
}
