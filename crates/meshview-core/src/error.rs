//! エラー型
//!
//! メッシュ読み込みとビューア操作で発生するエラーを定義

use thiserror::Error;

/// メッシュ読み込みエラー
/// 現在のロードのみ失敗扱いとし、新しい `load()` で回復可能
#[derive(Debug, Error)]
pub enum LoadError {
    /// ネットワーク到達不可などfetch自体の失敗
    #[error("failed to fetch mesh: {0}")]
    Fetch(String),

    /// HTTPステータスが2xx以外
    #[error("mesh request failed with HTTP status {0}")]
    HttpStatus(u16),

    /// タイムアウト
    #[error("mesh request timed out after {0} ms")]
    Timeout(u32),

    /// STLとして解釈できないデータ
    #[error("malformed mesh data: {0}")]
    Malformed(#[from] std::io::Error),

    /// 三角形が1つもない
    #[error("mesh contains no triangles")]
    EmptyMesh,

    /// インデックスが範囲外
    #[error("mesh index {index} is out of range for {vertex_count} vertices")]
    InvalidIndex { index: u32, vertex_count: usize },

    /// インデックス数が3の倍数でない
    #[error("mesh has {0} indices, which is not a whole number of triangles")]
    IncompleteTriangle(usize),

    /// NaN / Inf を含む頂点
    #[error("mesh contains non-finite vertex coordinates")]
    NonFinite,

    /// 大きさゼロ（正規化できない）
    #[error("mesh has zero extent and cannot be normalized")]
    ZeroExtent,
}

/// ビューア全体のエラー型
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("invalid viewer configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration JSON error: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("unknown unit system '{0}' (expected \"mm\" or \"in\")")]
    UnknownUnit(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("viewer has been disposed")]
    Disposed,
}

/// ビューア操作用Result型
pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_messages_are_readable() {
        assert_eq!(
            LoadError::HttpStatus(404).to_string(),
            "mesh request failed with HTTP status 404"
        );
        assert_eq!(
            LoadError::Timeout(30_000).to_string(),
            "mesh request timed out after 30000 ms"
        );
    }

    #[test]
    fn test_disposed_message() {
        assert_eq!(ViewerError::Disposed.to_string(), "viewer has been disposed");
    }

    #[test]
    fn test_io_error_becomes_malformed() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err = LoadError::from(io);
        assert!(matches!(err, LoadError::Malformed(_)));
    }
}
