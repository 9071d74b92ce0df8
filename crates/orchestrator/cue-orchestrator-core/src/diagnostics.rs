use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use cue_animation_core::{AnimationError, ElementId};

/// Diagnostics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsCfg {
    pub enabled: bool,
    /// Entries kept before the oldest are dropped.
    pub capacity: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        DiagnosticsCfg {
            enabled: true,
            capacity: 256,
        }
    }
}

/// One recovered failure. Nothing here ever reaches the host render path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Error kind, e.g. `"UnknownAnimationType"`.
    pub kind: String,
    pub element: ElementId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_type: Option<String>,
    /// Options that produced the failure, serialized.
    pub params: serde_json::Value,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(
        error: &AnimationError,
        element: ElementId,
        requested_type: Option<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            kind: error.kind_name().to_string(),
            element,
            requested_type,
            params,
            message: error.to_string(),
        }
    }
}

/// Bounded diagnostics buffer. Every record is also emitted through `log::warn!`.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    cfg: DiagnosticsCfg,
    entries: VecDeque<Diagnostic>,
    dropped: usize,
}

impl DiagnosticLog {
    pub fn new(cfg: DiagnosticsCfg) -> Self {
        Self {
            cfg,
            entries: VecDeque::new(),
            dropped: 0,
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        log::warn!(
            "{} on {}: {}",
            diagnostic.kind,
            diagnostic.element,
            diagnostic.message
        );
        if !self.cfg.enabled || self.cfg.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.cfg.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(diagnostic);
    }

    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }

    /// Entries of the given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries discarded because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(n: u32) -> Diagnostic {
        Diagnostic::from_error(
            &AnimationError::MissingTarget {
                element: ElementId(n),
            },
            ElementId(n),
            None,
            serde_json::Value::Null,
        )
    }

    #[test]
    fn log_is_bounded() {
        let mut log = DiagnosticLog::new(DiagnosticsCfg {
            enabled: true,
            capacity: 2,
        });
        for n in 0..5 {
            log.record(missing(n));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 3);
        assert_eq!(log.entries().next().unwrap().element, ElementId(3));
        assert_eq!(log.count("MissingTarget"), 2);
    }

    #[test]
    fn disabled_log_keeps_nothing() {
        let mut log = DiagnosticLog::new(DiagnosticsCfg {
            enabled: false,
            ..DiagnosticsCfg::default()
        });
        log.record(missing(1));
        assert!(log.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let mut d = missing(4);
        d.requested_type = Some("fadeIn".into());
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "MissingTarget");
        assert_eq!(json["requestedType"], "fadeIn");
    }
}
