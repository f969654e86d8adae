use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

/// Non-fatal diagnostic classes surfaced by the transform core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Degree exceeds the documented stable range of the pi/2 recursion.
    StabilityRisk,
    /// Reality acceleration requested for a nonzero spin; the complex code
    /// path is used instead.
    RealityDowngrade,
}

/// A recorded diagnostic. Computation always proceeds after a notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub component: &'static str,
    pub detail: String,
}

impl Notice {
    #[must_use]
    pub fn new(kind: NoticeKind, component: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            detail: detail.into(),
        }
    }

    /// Serialize to a JSON line for structured logging.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

static NOTICE_LOG: OnceLock<Mutex<Vec<Notice>>> = OnceLock::new();

fn notice_log() -> &'static Mutex<Vec<Notice>> {
    NOTICE_LOG.get_or_init(|| Mutex::new(Vec::new()))
}

/// Append a notice to the process-wide ledger.
pub fn record_notice(notice: Notice) {
    if let Ok(mut log) = notice_log().lock() {
        log.push(notice);
    }
}

/// Drain and return all recorded notices.
#[must_use]
pub fn take_notices() -> Vec<Notice> {
    if let Ok(mut log) = notice_log().lock() {
        let mut out = Vec::with_capacity(log.len());
        std::mem::swap(&mut *log, &mut out);
        return out;
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_records_and_drains() {
        let _ = take_notices();
        record_notice(Notice::new(
            NoticeKind::StabilityRisk,
            "trapani",
            "band-limit 2048 exceeds the stable range",
        ));
        let drained = take_notices();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].kind, NoticeKind::StabilityRisk);
        assert!(take_notices().is_empty());
    }

    #[test]
    fn notice_serializes_to_json_line() {
        let notice = Notice::new(NoticeKind::RealityDowngrade, "spherical", "spin 2");
        let parsed: serde_json::Value =
            serde_json::from_str(&notice.to_json_line()).expect("valid JSON");
        assert_eq!(parsed["kind"], "reality_downgrade");
        assert_eq!(parsed["component"], "spherical");
    }
}
