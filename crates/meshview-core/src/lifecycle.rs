/// ビューアのライフサイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Created,
    Running,
    Disposed,
}

impl Lifecycle {
    /// Created → Running。破棄済みなら何もしない
    pub fn start(&mut self) -> bool {
        if *self == Lifecycle::Created {
            *self = Lifecycle::Running;
            true
        } else {
            false
        }
    }

    /// 破棄状態へ遷移。今回の呼び出しで破棄した場合のみtrue
    pub fn dispose(&mut self) -> bool {
        if *self == Lifecycle::Disposed {
            return false;
        }
        *self = Lifecycle::Disposed;
        true
    }

    pub fn is_disposed(&self) -> bool {
        *self == Lifecycle::Disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_is_idempotent() {
        let mut lifecycle = Lifecycle::default();
        assert!(lifecycle.start());
        assert!(lifecycle.dispose());
        assert!(!lifecycle.dispose());
        assert!(lifecycle.is_disposed());
    }

    #[test]
    fn test_dispose_before_start() {
        let mut lifecycle = Lifecycle::default();
        assert!(lifecycle.dispose());
        assert!(!lifecycle.start());
    }
}
