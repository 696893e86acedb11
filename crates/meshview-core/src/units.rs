//! 単位系（表示専用）
//!
//! 距離は常にミリメートルで保持・通知する。ここは表示文字列の変換のみ。

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

pub const MM_PER_INCH: f32 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
    #[serde(rename = "in")]
    Inches,
}

impl UnitSystem {
    /// ミリメートル値を表示単位へ変換
    pub fn from_mm(self, mm: f32) -> f32 {
        match self {
            UnitSystem::Millimeters => mm,
            UnitSystem::Inches => mm / MM_PER_INCH,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            UnitSystem::Millimeters => "mm",
            UnitSystem::Inches => "in",
        }
    }

    /// ラベル用の距離文字列
    pub fn format_distance(self, mm: f32) -> String {
        match self {
            UnitSystem::Millimeters => format!("{:.2} {}", self.from_mm(mm), self.suffix()),
            UnitSystem::Inches => format!("{:.3} {}", self.from_mm(mm), self.suffix()),
        }
    }
}

impl std::str::FromStr for UnitSystem {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Ok(UnitSystem::Millimeters),
            "in" | "inch" | "inches" => Ok(UnitSystem::Inches),
            _ => Err(ViewerError::UnknownUnit(s.to_string())),
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}
