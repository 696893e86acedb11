//! 距離ラベルのラスタライズ
//!
//! OffscreenCanvas の2Dコンテキストで文字を描き、RGBAピクセルを取り出す

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{OffscreenCanvas, OffscreenCanvasRenderingContext2d};

const FONT_PX: f64 = 48.0;
const PADDING_PX: f64 = 12.0;

/// ラベル1枚分のビットマップ
pub struct LabelBitmap {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl LabelBitmap {
    /// 幅 / 高さ（ビルボードの縦横比）
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

pub fn rasterize_label(text: &str, color: [f32; 4]) -> Result<LabelBitmap, JsValue> {
    let font = format!("600 {}px sans-serif", FONT_PX);

    // 文字幅の計測用に一度コンテキストを作る
    let measurer = context_2d(&OffscreenCanvas::new(1, 1)?)?;
    measurer.set_font(&font);
    let text_width = measurer.measure_text(text)?.width();

    let width = (text_width + PADDING_PX * 2.0).ceil().max(1.0) as u32;
    let height = (FONT_PX + PADDING_PX * 2.0).ceil() as u32;

    let canvas = OffscreenCanvas::new(width, height)?;
    let ctx = context_2d(&canvas)?;

    ctx.set_fill_style_str("rgba(20, 22, 26, 0.75)");
    ctx.fill_rect(0.0, 0.0, width as f64, height as f64);

    ctx.set_font(&font);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str(&css_color(color));
    ctx.fill_text(text, width as f64 / 2.0, height as f64 / 2.0)?;

    let image = ctx.get_image_data(0.0, 0.0, width as f64, height as f64)?;
    Ok(LabelBitmap {
        rgba: image.data().0,
        width,
        height,
    })
}

fn context_2d(canvas: &OffscreenCanvas) -> Result<OffscreenCanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("OffscreenCanvas 2d context unavailable"))?
        .dyn_into::<OffscreenCanvasRenderingContext2d>()
        .map_err(|_| JsValue::from_str("Unexpected OffscreenCanvas context type"))
}

fn css_color(color: [f32; 4]) -> String {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({}, {}, {}, {})",
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        color[3].clamp(0.0, 1.0)
    )
}
