//! ユーティリティモジュール
//!
//! JSエラー変換、遅延破棄などのヘルパー

use std::fmt::{Debug, Display};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// RustのエラーをJSへ投げる値に変換
pub fn to_js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// JS例外からメッセージを取り出す
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// 現在のマイクロタスク終了後に値を破棄する
/// 実行中のClosure自身を解放する場合に使う
pub fn defer_drop<T: 'static>(value: T) {
    wasm_bindgen_futures::spawn_local(async move {
        drop(value);
    });
}

/// 失敗しても処理を続けてよい呼び出しの結果をログに残す
pub fn warn_on_err<T, E: Debug>(context: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("{} failed: {:?}", context, err);
            None
        }
    }
}

pub fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No global window available"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_on_err_passes_values_through() {
        assert_eq!(warn_on_err::<_, &str>("noop", Ok(3)), Some(3));
        assert_eq!(warn_on_err::<u8, _>("setPointerCapture", Err("InvalidPointerId")), None);
    }
}
