use serde::Serialize;

/// Counters for one scan pass. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scanned: usize,
    pub triggered: usize,
    pub deactivated: usize,
    pub sent_emails: usize,
    pub sent_push: usize,
}
