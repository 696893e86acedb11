//! 読み込み状態の追跡
//!
//! `load()` ごとにチケットを発行し、最新のチケットの結果だけを適用する。

use serde::Serialize;

/// 読み込み要求の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// ホストに公開する読み込み状態
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading { url: String },
    Ready { url: String },
    Failed { url: String, message: String },
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    next_ticket: u64,
    current: Option<(LoadTicket, String)>,
    status: LoadStatus,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい読み込みを開始。以前のチケットは無効になる
    pub fn begin(&mut self, url: impl Into<String>) -> LoadTicket {
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        let url = url.into();
        self.status = LoadStatus::Loading { url: url.clone() };
        self.current = Some((ticket, url));
        ticket
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.current.as_ref().is_some_and(|(current, _)| *current == ticket)
    }

    /// 成功を記録。古いチケットならfalse
    pub fn complete(&mut self, ticket: LoadTicket) -> bool {
        match self.take_current(ticket) {
            Some(url) => {
                self.status = LoadStatus::Ready { url };
                true
            }
            None => false,
        }
    }

    /// 失敗を記録。古いチケットならfalse
    pub fn fail(&mut self, ticket: LoadTicket, message: impl Into<String>) -> bool {
        match self.take_current(ticket) {
            Some(url) => {
                self.status = LoadStatus::Failed {
                    url,
                    message: message.into(),
                };
                true
            }
            None => false,
        }
    }

    /// 進行中の読み込みを全て無効化（破棄時）
    pub fn invalidate(&mut self) {
        self.current = None;
        if matches!(self.status, LoadStatus::Loading { .. }) {
            self.status = LoadStatus::Idle;
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    fn take_current(&mut self, ticket: LoadTicket) -> Option<String> {
        if !self.is_current(ticket) {
            return None;
        }
        self.current.take().map(|(_, url)| url)
    }
}
