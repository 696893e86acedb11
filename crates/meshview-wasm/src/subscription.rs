//! イベント購読管理モジュール
//!
//! `on(event, callback)` で登録されたコールバックをイベント種別ごとに保持する

use std::collections::HashMap;

use meshview_core::EventKind;

/// 購読情報
pub struct Subscription<F> {
    pub kind: EventKind,
    pub callback: F,
}

/// 購読マネージャー
/// 通知順は登録順（ID昇順）
pub struct CallbackRegistry<F = js_sys::Function> {
    subscriptions: HashMap<u32, Subscription<F>>,
    next_id: u32,
}

impl<F: Clone> CallbackRegistry<F> {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn subscribe(&mut self, kind: EventKind, callback: F) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        self.subscriptions.insert(id, Subscription { kind, callback });

        id
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// 指定種別の購読を全て外す。外した数を返す
    pub fn unsubscribe_kind(&mut self, kind: EventKind) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|_, sub| sub.kind != kind);
        before - self.subscriptions.len()
    }

    /// 指定種別のコールバックを登録順で複製して返す
    /// 呼び出し側は借用を手放してから実行する
    pub fn callbacks_for(&self, kind: EventKind) -> Vec<F> {
        let mut matching: Vec<(u32, &Subscription<F>)> = self
            .subscriptions
            .iter()
            .filter(|(_, sub)| sub.kind == kind)
            .map(|(id, sub)| (*id, sub))
            .collect();
        matching.sort_by_key(|(id, _)| *id);
        matching
            .into_iter()
            .map(|(_, sub)| sub.callback.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl<F: Clone> Default for CallbackRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}
