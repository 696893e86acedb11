//! ブラウザ向けメッシュビューア
//!
//! `MeshViewer` がキャンバス、描画ループ、入力、読み込み、イベント購読をまとめる。
//! 状態は `ViewerSession` にあり、ここはDOM/WebGPUとの接続だけを担う。

mod input;
mod label_texture;
mod loader;
mod render_loop;
mod renderer;
mod shaders;
mod subscription;
mod utils;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use meshview_core::{
    EventKind, UnitSystem, ViewerConfig, ViewerError, ViewerEvent, ViewerSnapshot,
};
use meshview_renderer::{PointerButton, ViewerSession};

use input::ListenerSet;
use render_loop::RenderLoop;
use renderer::Renderer;
use subscription::CallbackRegistry;
use utils::{to_js_error, warn_on_err, window};

// パニック時のスタックトレース表示とログ出力先の設定
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    tracing::info!("meshview-wasm initialized");
}

/// ビューアの共有状態
/// 描画ループ、DOMリスナー、非同期読み込みがそれぞれ参照を持つ
struct ViewerState {
    session: ViewerSession<Vec<ViewerEvent>>,
    renderer: Option<Renderer>,
    callbacks: CallbackRegistry,
}

type SharedState = Rc<RefCell<ViewerState>>;

/// 積まれたイベントを購読者へ通知する
/// 借用を手放してから呼ぶので、コールバック内でビューアを操作してよい
fn flush_events(state: &SharedState) {
    let calls: Vec<(Function, JsValue)> = {
        let mut s = state.borrow_mut();
        let events = s.session.drain_events();
        events
            .iter()
            .flat_map(|event| {
                let payload = event_payload(event);
                s.callbacks
                    .callbacks_for(event.kind())
                    .into_iter()
                    .map(move |callback| (callback, payload.clone()))
            })
            .collect()
    };

    for (callback, payload) in calls {
        if let Err(err) = callback.call1(&JsValue::NULL, &payload) {
            tracing::warn!("Event listener threw: {:?}", err);
        }
    }
}

/// イベントのJS表現
fn event_payload(event: &ViewerEvent) -> JsValue {
    let serialized = match event {
        ViewerEvent::MeasurementChanged(distance) => Ok(distance.map_or(JsValue::NULL, JsValue::from)),
        ViewerEvent::ViewAnglesChanged(angles) => serde_wasm_bindgen::to_value(angles),
        ViewerEvent::ModelDimensionsCalculated(dimensions) => {
            serde_wasm_bindgen::to_value(dimensions)
        }
        ViewerEvent::LoadFailed(message) => Ok(JsValue::from_str(message)),
        ViewerEvent::ScreenshotTaken(snapshot) => Ok(snapshot_object(snapshot).into()),
    };
    serialized.unwrap_or_else(|err| {
        tracing::warn!("Failed to serialize {} event: {}", event.kind().name(), err);
        JsValue::UNDEFINED
    })
}

fn snapshot_object(snapshot: &ViewerSnapshot) -> Object {
    let object = Object::new();
    let entries: [(&str, JsValue); 4] = [
        ("bytes", Uint8Array::from(snapshot.png.as_slice()).into()),
        ("width", snapshot.width.into()),
        ("height", snapshot.height.into()),
        ("capturedAt", snapshot.captured_at_ms.into()),
    ];
    for (key, value) in entries {
        warn_on_err("Reflect.set", Reflect::set(&object, &JsValue::from_str(key), &value));
    }
    object
}

/// 設定値の解釈。undefined/null は既定値、文字列はJSON、オブジェクトはそのまま
fn parse_config(value: JsValue) -> Result<ViewerConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(ViewerConfig::default());
    }
    let config = match value.as_string() {
        Some(json) => ViewerConfig::from_json(&json).map_err(to_js_error)?,
        None => serde_wasm_bindgen::from_value::<ViewerConfig>(value).map_err(to_js_error)?,
    };
    config.validate().map_err(to_js_error)?;
    Ok(config)
}

// ============================================================================
// MeshViewer
// ============================================================================

/// JSへ公開するビューアハンドル
///
/// 全メソッドが `&self` を取るので、イベントコールバックの中から
/// 別のメソッド（`dispose()` を含む）を呼んでもよい。
#[wasm_bindgen]
pub struct MeshViewer {
    state: SharedState,
    canvas: HtmlCanvasElement,
    render_loop: RefCell<Option<RenderLoop>>,
    listeners: RefCell<Option<ListenerSet>>,
}

#[wasm_bindgen]
impl MeshViewer {
    /// ビューアを作成（非同期）
    /// `model_url` があれば作成後すぐに読み込みを開始する（完了は待たない）
    pub async fn create(
        canvas: HtmlCanvasElement,
        model_url: Option<String>,
        config: JsValue,
    ) -> Result<MeshViewer, JsValue> {
        tracing::info!("Creating MeshViewer...");
        let config = parse_config(config)?;

        input::fit_canvas_to_display(&canvas);
        let renderer = Renderer::create(canvas.clone(), &config).await?;
        let (width, height) = (renderer.width(), renderer.height());

        let mut session =
            ViewerSession::new(config, width, height, Vec::new()).map_err(to_js_error)?;
        session.start();

        let state = Rc::new(RefCell::new(ViewerState {
            session,
            renderer: Some(renderer),
            callbacks: CallbackRegistry::new(),
        }));

        let viewer = MeshViewer {
            render_loop: RefCell::new(Some(start_render_loop(state.clone())?)),
            listeners: RefCell::new(Some(attach_listeners(&canvas, &state)?)),
            state,
            canvas,
        };

        if let Some(url) = model_url {
            let state = viewer.state.clone();
            wasm_bindgen_futures::spawn_local(async move {
                run_load(state, url).await;
            });
        }

        tracing::info!("MeshViewer created successfully");
        Ok(viewer)
    }

    // ========================================================================
    // 読み込み
    // ========================================================================

    /// モデルを読み込む。実行中の読み込みは破棄される
    /// 失敗時は `loadError` イベントに加えてPromiseもrejectする
    pub fn load(&self, url: String) -> js_sys::Promise {
        let state = self.state.clone();
        future_to_promise(async move {
            match run_load(state, url).await {
                Some(message) => Err(JsValue::from_str(&message)),
                None => Ok(JsValue::UNDEFINED),
            }
        })
    }

    /// 読み込み状態 `{ state: "idle" | "loading" | "ready" | "failed", url?, message? }`
    #[wasm_bindgen(js_name = getStatus)]
    pub fn get_status(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.state.borrow().session.status()).map_err(to_js_error)
    }

    // ========================================================================
    // 計測
    // ========================================================================

    /// 計測モードの切り替え。切り替え後に計測モードならtrue
    #[wasm_bindgen(js_name = toggleMeasurement)]
    pub fn toggle_measurement(&self) -> bool {
        let armed = self.state.borrow_mut().session.toggle_measurement();
        flush_events(&self.state);
        armed
    }

    #[wasm_bindgen(js_name = resetMeasurements)]
    pub fn reset_measurements(&self) {
        self.state.borrow_mut().session.reset_measurements();
        flush_events(&self.state);
    }

    /// 直近の計測距離（mm）。なければ null
    #[wasm_bindgen(js_name = getDistance)]
    pub fn get_distance(&self) -> Option<f32> {
        self.state.borrow().session.distance()
    }

    /// 表示単位を切り替える（"mm" / "in"）。距離の値は常にmm
    #[wasm_bindgen(js_name = setUnits)]
    pub fn set_units(&self, units: &str) -> Result<(), JsValue> {
        let units: UnitSystem = units.parse().map_err(to_js_error)?;
        self.state.borrow_mut().session.set_units(units);
        flush_events(&self.state);
        Ok(())
    }

    #[wasm_bindgen(js_name = getUnits)]
    pub fn get_units(&self) -> String {
        self.state.borrow().session.units().to_string()
    }

    // ========================================================================
    // カメラ
    // ========================================================================

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&self) {
        self.state.borrow_mut().session.reset_view();
        flush_events(&self.state);
    }

    /// `{ azimuth, elevation, radius }`（ラジアン）。破棄後は null
    #[wasm_bindgen(js_name = getViewAngles)]
    pub fn get_view_angles(&self) -> Result<JsValue, JsValue> {
        match self.state.borrow().session.view_angles() {
            Some(angles) => serde_wasm_bindgen::to_value(&angles).map_err(to_js_error),
            None => Ok(JsValue::NULL),
        }
    }

    /// `{ width, height, depth, volume }`（mm / mm³）。モデルがなければ null
    #[wasm_bindgen(js_name = getModelDimensions)]
    pub fn get_model_dimensions(&self) -> Result<JsValue, JsValue> {
        match self.state.borrow().session.model_dimensions() {
            Some(dimensions) => serde_wasm_bindgen::to_value(&dimensions).map_err(to_js_error),
            None => Ok(JsValue::NULL),
        }
    }

    // ========================================================================
    // スクリーンショット
    // ========================================================================

    /// 現在の表示をPNGで取得する（Uint8Array）
    /// 計測やカメラの状態は変わらない
    #[wasm_bindgen(js_name = takeScreenshot)]
    pub fn take_screenshot(&self) -> js_sys::Promise {
        let state = self.state.clone();
        future_to_promise(async move {
            let pending = {
                let mut s = state.borrow_mut();
                let ViewerState {
                    session, renderer, ..
                } = &mut *s;
                if session.is_disposed() {
                    return Err(to_js_error(ViewerError::Disposed));
                }
                let renderer = renderer
                    .as_mut()
                    .ok_or_else(|| JsValue::from_str("Renderer is not available"))?;
                renderer.capture(session.scene_mut()).map_err(to_js_error)?
            };

            let image = pending.finish().await.map_err(to_js_error)?;
            let bytes = Uint8Array::from(image.png.as_slice());

            let snapshot =
                ViewerSnapshot::new(image.png, image.width, image.height, js_sys::Date::now());
            state.borrow_mut().session.record_snapshot(snapshot);
            flush_events(&state);

            Ok(bytes.into())
        })
    }

    // ========================================================================
    // イベント購読
    // ========================================================================

    /// コールバックを登録し、購読IDを返す
    /// event: "measurementChange" | "viewAnglesChange" | "screenshotTaken"
    ///      | "modelDimensionsCalculated" | "loadError"
    pub fn on(&self, event: &str, callback: Function) -> Result<u32, JsValue> {
        let kind: EventKind = event.parse().map_err(to_js_error)?;
        let mut s = self.state.borrow_mut();
        if s.session.is_disposed() {
            return Err(to_js_error(ViewerError::Disposed));
        }
        Ok(s.callbacks.subscribe(kind, callback))
    }

    /// 購読を解除する。存在しなかった場合false
    pub fn off(&self, id: u32) -> bool {
        self.state.borrow_mut().callbacks.unsubscribe(id)
    }

    /// 指定イベントの購読を全て解除し、解除数を返す
    #[wasm_bindgen(js_name = offAll)]
    pub fn off_all(&self, event: &str) -> Result<usize, JsValue> {
        let kind: EventKind = event.parse().map_err(to_js_error)?;
        Ok(self.state.borrow_mut().callbacks.unsubscribe_kind(kind))
    }

    // ========================================================================
    // サイズ / 破棄
    // ========================================================================

    /// 描画バッファのサイズを明示的に設定する
    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.state.borrow_mut().session.resize(width, height);
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// 描画ループ、リスナー、読み込み、GPUリソース、購読を全て解放する
    /// 2回目以降は何もしない
    pub fn dispose(&self) {
        if let Some(mut render_loop) = self.render_loop.borrow_mut().take() {
            render_loop.stop();
        }
        self.listeners.borrow_mut().take();

        let mut s = self.state.borrow_mut();
        s.session.dispose();
        if let Some(mut renderer) = s.renderer.take() {
            renderer.destroy();
        }
        // 破棄時の状態変化は通知しない
        s.session.drain_events();
        s.callbacks.clear();
    }

    #[wasm_bindgen(js_name = isDisposed)]
    pub fn is_disposed(&self) -> bool {
        self.state.borrow().session.is_disposed()
    }
}

impl Drop for MeshViewer {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// 内部処理
// ============================================================================

/// 読み込みを実行する。この読み込みが失敗として確定した場合はメッセージを返す
async fn run_load(state: SharedState, url: String) -> Option<String> {
    let (ticket, timeout_ms, normalized_size) = {
        let mut s = state.borrow_mut();
        let ticket = s.session.begin_load(&url)?;
        let config = s.session.config();
        (ticket, config.load_timeout_ms, config.normalized_size)
    };

    let result = loader::fetch_mesh(&url, timeout_ms, normalized_size).await;
    let failure = result.as_ref().err().map(ToString::to_string);

    let applied = state.borrow_mut().session.finish_load(ticket, result);
    flush_events(&state);

    if applied { failure } else { None }
}

fn start_render_loop(state: SharedState) -> Result<RenderLoop, JsValue> {
    RenderLoop::start(move |_timestamp| {
        {
            let mut s = state.borrow_mut();
            let ViewerState {
                session, renderer, ..
            } = &mut *s;
            session.frame();
            if let Some(renderer) = renderer.as_mut() {
                if let Err(err) = renderer.render(session.scene_mut()) {
                    tracing::error!("Render failed: {:?}", err);
                }
            }
        }
        flush_events(&state);
    })
}

/// キャンバスとウィンドウへ入力リスナーを登録する
fn attach_listeners(canvas: &HtmlCanvasElement, state: &SharedState) -> Result<ListenerSet, JsValue> {
    let mut listeners = ListenerSet::new();
    let target: &web_sys::EventTarget = canvas.as_ref();

    {
        let (state, canvas) = (state.clone(), canvas.clone());
        listeners.listen(target, "pointerdown", move |event| {
            let Some(event) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            let Some(button) = PointerButton::from_dom(event.button()) else {
                return;
            };
            warn_on_err("setPointerCapture", canvas.set_pointer_capture(event.pointer_id()));
            let (x, y) = input::canvas_position(&canvas, event);
            state.borrow_mut().session.pointer_down(button, x, y);
        })?;
    }
    {
        let (state, canvas) = (state.clone(), canvas.clone());
        listeners.listen(target, "pointermove", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let (x, y) = input::canvas_position(&canvas, event);
            state.borrow_mut().session.pointer_move(x, y);
        })?;
    }
    {
        let (state, canvas) = (state.clone(), canvas.clone());
        listeners.listen(target, "pointerup", move |event| {
            let Some(event) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            warn_on_err(
                "releasePointerCapture",
                canvas.release_pointer_capture(event.pointer_id()),
            );
            let (x, y) = input::canvas_position(&canvas, event);
            state.borrow_mut().session.pointer_up(x, y);
            flush_events(&state);
        })?;
    }
    {
        let state = state.clone();
        listeners.listen(target, "pointercancel", move |_event| {
            state.borrow_mut().session.pointer_cancel();
        })?;
    }
    {
        let state = state.clone();
        listeners.listen_active(target, "wheel", move |event| {
            let Some(event) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            event.prevent_default();
            state
                .borrow_mut()
                .session
                .wheel(input::wheel_delta_pixels(event));
        })?;
    }
    // 右ドラッグでパンするのでメニューを出さない
    listeners.listen_active(target, "contextmenu", |event| event.prevent_default())?;

    // ウィンドウのリサイズと、コンテナだけが変わる場合の両方を拾う
    let on_display_resize = |state: SharedState, canvas: HtmlCanvasElement| {
        move || {
            if let Some((width, height)) = input::fit_canvas_to_display(&canvas) {
                state.borrow_mut().session.resize(width, height);
            }
        }
    };
    {
        let handler = on_display_resize(state.clone(), canvas.clone());
        listeners.listen(window()?.as_ref(), "resize", move |_event| handler())?;
    }
    listeners.observe_resize(canvas.as_ref(), on_display_resize(state.clone(), canvas.clone()))?;

    Ok(listeners)
}
