//! シェーダーモジュール
//!
//! WGSLシェーダーを外部ファイルから読み込む

/// モデル描画用（キーライト + 環境光）
pub const MESH_SHADER: &str = include_str!("mesh.wgsl");

/// 計測マーカー・線用（頂点カラー）
pub const OVERLAY_SHADER: &str = include_str!("overlay.wgsl");

/// 距離ラベル用（テクスチャ付きビルボード）
pub const LABEL_SHADER: &str = include_str!("label.wgsl");
