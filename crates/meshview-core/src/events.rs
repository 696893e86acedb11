//! ホストへ通知するイベント
//!
//! セッションはイベントを `EventSink` に積むだけで、JSコールバックの
//! 呼び出しは内部状態の借用を解放した後にまとめて行う。

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;
use crate::model::ModelDimensions;
use crate::snapshot::ViewerSnapshot;

/// カメラの球面座標（ラジアン / シーン単位）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewAngles {
    pub azimuth: f32,
    pub elevation: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// 計測完了時は距離(mm)、クリア時はNone
    MeasurementChanged(Option<f32>),
    /// カメラが静止したときのみ
    ViewAnglesChanged(ViewAngles),
    ScreenshotTaken(ViewerSnapshot),
    /// 読み込み成功ごとに1回
    ModelDimensionsCalculated(ModelDimensions),
    LoadFailed(String),
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::MeasurementChanged(_) => EventKind::MeasurementChange,
            ViewerEvent::ViewAnglesChanged(_) => EventKind::ViewAnglesChange,
            ViewerEvent::ScreenshotTaken(_) => EventKind::ScreenshotTaken,
            ViewerEvent::ModelDimensionsCalculated(_) => EventKind::ModelDimensionsCalculated,
            ViewerEvent::LoadFailed(_) => EventKind::LoadError,
        }
    }
}

/// `on()` で購読できるイベント名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MeasurementChange,
    ViewAnglesChange,
    ScreenshotTaken,
    ModelDimensionsCalculated,
    LoadError,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::MeasurementChange,
        EventKind::ViewAnglesChange,
        EventKind::ScreenshotTaken,
        EventKind::ModelDimensionsCalculated,
        EventKind::LoadError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::MeasurementChange => "measurementChange",
            EventKind::ViewAnglesChange => "viewAnglesChange",
            EventKind::ScreenshotTaken => "screenshotTaken",
            EventKind::ModelDimensionsCalculated => "modelDimensionsCalculated",
            EventKind::LoadError => "loadError",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ViewerError::UnknownEvent(s.to_string()))
    }
}

/// イベントの受け口
pub trait EventSink {
    fn emit(&mut self, event: ViewerEvent);
}

impl EventSink for Vec<ViewerEvent> {
    fn emit(&mut self, event: ViewerEvent) {
        self.push(event);
    }
}
