//! 数学型の再エクスポート
//!
//! クレート間でglamのバージョンを揃えるため、ここ経由で使う

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
