//! requestAnimationFrame ループ

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::utils::{defer_drop, warn_on_err, window};

type FrameCallback = Closure<dyn FnMut(f64)>;

/// フレームごとにコールバックを呼ぶループ
/// `stop()` またはDropで止まる
pub struct RenderLoop {
    callback: Rc<RefCell<Option<FrameCallback>>>,
    handle: Rc<Cell<Option<i32>>>,
}

impl RenderLoop {
    pub fn start(mut on_frame: impl FnMut(f64) + 'static) -> Result<Self, JsValue> {
        let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
        let handle = Rc::new(Cell::new(None));

        let slot = callback.clone();
        let next_handle = handle.clone();
        *callback.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
            next_handle.set(None);
            on_frame(timestamp);

            // on_frame内で止められた場合はスロットが空
            if let Some(cb) = slot.borrow().as_ref() {
                match request_frame(cb) {
                    Ok(id) => next_handle.set(Some(id)),
                    Err(err) => tracing::error!("requestAnimationFrame failed: {:?}", err),
                }
            }
        }));

        let first = match callback.borrow().as_ref() {
            Some(cb) => request_frame(cb)?,
            None => return Err(JsValue::from_str("Render loop callback missing")),
        };
        handle.set(Some(first));

        Ok(Self { callback, handle })
    }

    pub fn stop(&mut self) {
        if let Some(id) = self.handle.take() {
            if let Ok(window) = window() {
                warn_on_err("cancelAnimationFrame", window.cancel_animation_frame(id));
            }
        }
        // フレームコールバックの中から呼ばれる場合があるので解放は後回し
        if let Some(cb) = self.callback.borrow_mut().take() {
            defer_drop(cb);
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn request_frame(callback: &FrameCallback) -> Result<i32, JsValue> {
    window()?.request_animation_frame(callback.as_ref().unchecked_ref())
}
