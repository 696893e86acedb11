/// 書き出した画像
/// 呼び出し側に所有権を渡し、ビューアは保持しない
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    /// PNGエンコード済みバイト列
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// キャプチャ時刻（ホストのエポックミリ秒）
    pub captured_at_ms: f64,
}

impl ViewerSnapshot {
    pub fn new(png: Vec<u8>, width: u32, height: u32, captured_at_ms: f64) -> Self {
        Self {
            png,
            width,
            height,
            captured_at_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }
}
