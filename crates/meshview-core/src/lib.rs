//! メッシュビューアのコアデータ
//!
//! GPUやブラウザに依存しない部分（モデル、計測、イベント、設定）

pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod load;
pub mod math;
pub mod measurement;
pub mod model;
pub mod scene;
pub mod snapshot;
pub mod units;

// Re-exports
pub use components::{Label, ModelUniform, Transform};
pub use config::{CameraConfig, MarkerStyle, ViewerConfig};
pub use error::{LoadError, Result, ViewerError};
pub use events::{EventKind, EventSink, ViewAngles, ViewerEvent};
pub use lifecycle::Lifecycle;
pub use load::{LoadStatus, LoadTicket, LoadTracker};
pub use measurement::{
    ClickOutcome, MeasurementPair, MeasurementPoint, MeasurementPicker, PickerState, SurfaceHit,
    SurfacePicker,
};
pub use model::{BoundingBox, MeshModel, ModelDimensions, VOLUME_CORRECTION};
pub use scene::{NodeId, OverlayGroup, OverlayKind, OverlayNode};
pub use snapshot::ViewerSnapshot;
pub use units::UnitSystem;
