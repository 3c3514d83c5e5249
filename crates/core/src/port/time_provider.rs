// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Local wall-clock stamp used in backup names (yyyyMMdd_HHmmss)
    fn file_stamp(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.now_millis())
            .map(|utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%Y%m%d_%H%M%S")
                    .to_string()
            })
            .unwrap_or_else(|| "00000000_000000".to_string())
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;

    /// Frozen clock; the file stamp is fixed so backup paths are predictable
    pub struct FixedTimeProvider {
        pub millis: i64,
        pub stamp: String,
    }

    impl FixedTimeProvider {
        pub fn new(millis: i64, stamp: impl Into<String>) -> Self {
            Self {
                millis,
                stamp: stamp.into(),
            }
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.millis
        }

        fn file_stamp(&self) -> String {
            self.stamp.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stamp_shape() {
        let stamp = SystemTimeProvider.file_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(stamp.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
