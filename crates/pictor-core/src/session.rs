use indexmap::IndexMap;
use serde::Serialize;

/// Outcome of one import: each distinct warning with its occurrence count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub messages: IndexMap<String, usize>,
    /// Total occurrences across all messages.
    pub total: usize,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.total == 0
    }
}

/// Warning aggregation scope threaded through a decode.
///
/// Repeated messages are counted rather than logged; [`ImportSession::finish`] emits one
/// summary event.
#[derive(Debug, Default)]
pub struct ImportSession {
    messages: IndexMap<String, usize>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        *self.messages.entry(message.into()).or_insert(0) += 1;
    }

    pub fn unsupported_element(&mut self, tag: &str) {
        self.warn(format!("unsupported element <{tag}> dropped"));
    }

    pub fn unsupported_attribute(&mut self, tag: &str, attr: &str) {
        self.warn(format!("unsupported attribute {attr} on <{tag}> dropped"));
    }

    pub fn invalid_path_data(&mut self, err: &crate::path::PathDataError) {
        self.warn(format!("invalid path data dropped: {}", err.message));
    }

    pub fn finish(self) -> ImportReport {
        let total = self.messages.values().sum();
        if total > 0 {
            tracing::warn!(
                distinct = self.messages.len(),
                total,
                "import dropped unsupported content"
            );
            for (message, count) in &self.messages {
                tracing::debug!(count, "{message}");
            }
        }
        ImportReport {
            messages: self.messages,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_messages_are_counted_once() {
        let mut s = ImportSession::new();
        s.unsupported_element("script");
        s.unsupported_element("script");
        s.unsupported_attribute("rect", "onclick");
        let report = s.finish();
        assert_eq!(report.total, 3);
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages["unsupported element <script> dropped"], 2);
        assert!(!report.is_clean());
        assert!(ImportSession::new().finish().is_clean());
    }
}
