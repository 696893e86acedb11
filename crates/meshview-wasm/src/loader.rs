//! メッシュ取得モジュール
//!
//! fetch + AbortController でSTLを取得し、タイムアウトで中断する

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, RequestInit, Response};

use meshview_core::{LoadError, MeshModel};

use crate::utils::{js_error_message, window};

/// URLからSTLを取得してモデルを構築
pub async fn fetch_mesh(
    url: &str,
    timeout_ms: Option<u32>,
    normalized_size: f32,
) -> Result<MeshModel, LoadError> {
    let bytes = fetch_bytes(url, timeout_ms).await?;
    tracing::debug!("Fetched {} bytes from {}", bytes.len(), url);
    MeshModel::from_stl_bytes(&bytes, normalized_size)
}

async fn fetch_bytes(url: &str, timeout_ms: Option<u32>) -> Result<Vec<u8>, LoadError> {
    let window = window().map_err(|e| LoadError::Fetch(js_error_message(&e)))?;
    let controller =
        AbortController::new().map_err(|e| LoadError::Fetch(js_error_message(&e)))?;

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_signal(Some(&controller.signal()));

    // 取得完了まで生かしておく（Dropでタイマー解除）
    let timeout = match timeout_ms {
        Some(ms) => Some(Timeout::start(&window, controller.clone(), ms)?),
        None => None,
    };
    let classify = |err: JsValue| match (&timeout, timeout_ms) {
        (Some(t), Some(ms)) if t.fired() => LoadError::Timeout(ms),
        _ => LoadError::Fetch(js_error_message(&err)),
    };

    let response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(classify)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| LoadError::Fetch("fetch did not return a Response".to_string()))?;

    if !response.ok() {
        return Err(LoadError::HttpStatus(response.status()));
    }

    let body = response.array_buffer().map_err(classify)?;
    let buffer = JsFuture::from(body).await.map_err(classify)?;

    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// setTimeoutでAbortControllerを中断するタイマー
struct Timeout {
    handle: i32,
    fired: Rc<Cell<bool>>,
    _callback: Closure<dyn FnMut()>,
}

impl Timeout {
    fn start(window: &web_sys::Window, controller: AbortController, ms: u32) -> Result<Self, LoadError> {
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            flag.set(true);
            controller.abort();
        });

        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                ms.min(i32::MAX as u32) as i32,
            )
            .map_err(|e| LoadError::Fetch(js_error_message(&e)))?;

        Ok(Self {
            handle,
            fired,
            _callback: callback,
        })
    }

    fn fired(&self) -> bool {
        self.fired.get()
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}
