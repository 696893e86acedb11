/// 距離ラベル
/// オーバーレイ上にビルボード表示されるテキスト
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    text: String,
}

impl Label {
    /// 新しいラベルを作成
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// テキストを文字列スライスとして取得
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// テキストを差し替え（単位切り替え時）
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let label = Label::new("10.00 mm");
        assert_eq!(label.as_str(), "10.00 mm");
    }

    #[test]
    fn test_set_text() {
        let mut label = Label::new("10.00 mm");
        label.set_text(String::from("0.394 in"));
        assert_eq!(label.as_str(), "0.394 in");
    }

    #[test]
    fn test_display() {
        let label = Label::new("3.50 mm");
        assert_eq!(format!("{}", label), "3.50 mm");
    }
}
