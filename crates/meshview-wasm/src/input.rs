//! DOMイベントリスナー管理
//!
//! 登録したリスナーはDropで全て取り外す

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Element, EventTarget, HtmlCanvasElement, MouseEvent, ResizeObserver,
};

use crate::utils::{defer_drop, warn_on_err};

type Listener = Closure<dyn FnMut(web_sys::Event)>;
type ResizeCallback = Closure<dyn FnMut(js_sys::Array)>;

struct Registration {
    target: EventTarget,
    name: &'static str,
    callback: Listener,
}

#[derive(Default)]
pub struct ListenerSet {
    registrations: Vec<Registration>,
    observers: Vec<(ResizeObserver, ResizeCallback)>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(
        &mut self,
        target: &EventTarget,
        name: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<(), JsValue> {
        self.listen_with(target, name, false, handler)
    }

    /// `preventDefault()` を呼ぶリスナー（wheelなど）は passive: false で登録する
    pub fn listen_active(
        &mut self,
        target: &EventTarget,
        name: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<(), JsValue> {
        self.listen_with(target, name, true, handler)
    }

    /// 要素自体のサイズ変化を監視する（ウィンドウが変わらないコンテナのリサイズ用）
    pub fn observe_resize(
        &mut self,
        target: &Element,
        mut handler: impl FnMut() + 'static,
    ) -> Result<(), JsValue> {
        let callback: ResizeCallback = Closure::new(move |_entries: js_sys::Array| handler());
        let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
        observer.observe(target);
        self.observers.push((observer, callback));
        Ok(())
    }

    fn listen_with(
        &mut self,
        target: &EventTarget,
        name: &'static str,
        active: bool,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<(), JsValue> {
        let callback: Listener = Closure::new(handler);
        if active {
            let options = AddEventListenerOptions::new();
            options.set_passive(false);
            target.add_event_listener_with_callback_and_add_event_listener_options(
                name,
                callback.as_ref().unchecked_ref(),
                &options,
            )?;
        } else {
            target.add_event_listener_with_callback(name, callback.as_ref().unchecked_ref())?;
        }
        self.registrations.push(Registration {
            target: target.clone(),
            name,
            callback,
        });
        Ok(())
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        for registration in self.registrations.drain(..) {
            warn_on_err(
                "removeEventListener",
                registration.target.remove_event_listener_with_callback(
                    registration.name,
                    registration.callback.as_ref().unchecked_ref(),
                ),
            );
            // リスナー実行中にdisposeされることがある
            defer_drop(registration.callback);
        }
        for (observer, callback) in self.observers.drain(..) {
            observer.disconnect();
            defer_drop(callback);
        }
    }
}

/// CSSピクセルのポインタ位置をキャンバスのピクセル座標へ
pub fn canvas_position(canvas: &HtmlCanvasElement, event: &MouseEvent) -> (f32, f32) {
    let (scale_x, scale_y) = css_to_canvas_scale(canvas);
    (
        event.offset_x() as f32 * scale_x,
        event.offset_y() as f32 * scale_y,
    )
}

fn css_to_canvas_scale(canvas: &HtmlCanvasElement) -> (f32, f32) {
    let client_w = canvas.client_width();
    let client_h = canvas.client_height();
    if client_w <= 0 || client_h <= 0 {
        return (1.0, 1.0);
    }
    (
        canvas.width() as f32 / client_w as f32,
        canvas.height() as f32 / client_h as f32,
    )
}

/// 表示サイズ × devicePixelRatio に描画バッファを合わせる
/// 変化があれば新しいサイズを返す
pub fn fit_canvas_to_display(canvas: &HtmlCanvasElement) -> Option<(u32, u32)> {
    let ratio = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
    let (width, height) = display_size(
        (canvas.client_width(), canvas.client_height()),
        ratio,
        (canvas.width(), canvas.height()),
    )?;
    canvas.set_width(width);
    canvas.set_height(height);
    Some((width, height))
}

/// CSSサイズとdevicePixelRatioから描画バッファのサイズを決める
/// 非表示（0）や現在と同じサイズならNone
fn display_size(client: (i32, i32), ratio: f64, current: (u32, u32)) -> Option<(u32, u32)> {
    let scale = |css: i32| (css.max(0) as f64 * ratio).round() as u32;
    let size = (scale(client.0), scale(client.1));
    if size.0 == 0 || size.1 == 0 || size == current {
        return None;
    }
    Some(size)
}

/// WheelEvent.deltaY をピクセル相当に揃える
pub fn wheel_delta_pixels(event: &web_sys::WheelEvent) -> f32 {
    const LINE_HEIGHT_PX: f64 = 16.0;
    let delta = event.delta_y();
    let pixels = match event.delta_mode() {
        web_sys::WheelEvent::DOM_DELTA_LINE => delta * LINE_HEIGHT_PX,
        web_sys::WheelEvent::DOM_DELTA_PAGE => delta * 800.0,
        _ => delta,
    };
    pixels as f32
}
