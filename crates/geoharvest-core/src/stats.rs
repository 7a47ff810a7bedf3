//! Per-run counters reported by the scan and convert services.

use crate::traits::SaveOutcome;

/// How one scanned product ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Created,
    Replaced,
    Frozen,
    Failed,
}

impl From<SaveOutcome> for ScanOutcome {
    fn from(outcome: SaveOutcome) -> Self {
        match outcome {
            SaveOutcome::Created => ScanOutcome::Created,
            SaveOutcome::Replaced => ScanOutcome::Replaced,
            SaveOutcome::Frozen => ScanOutcome::Frozen,
        }
    }
}

/// Counters for one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub created: u64,
    pub replaced: u64,
    pub frozen: u64,
    pub failed: u64,
}

impl ScanStats {
    pub fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Created => self.created += 1,
            ScanOutcome::Replaced => self.replaced += 1,
            ScanOutcome::Frozen => self.frozen += 1,
            ScanOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.created + self.replaced + self.frozen + self.failed
    }

    pub fn successful(&self) -> u64 {
        self.created + self.replaced
    }
}

/// How one record fared during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// Converted and written to the publish sink.
    Published,
    /// Not in the active state, left alone.
    Skipped,
    /// Active but failed a conversion validity rule.
    Rejected,
    /// An error occurred while converting or publishing.
    Failed,
}

/// Counters for one convert run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub published: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl ConvertStats {
    pub fn record(&mut self, outcome: ConvertOutcome) {
        match outcome {
            ConvertOutcome::Published => self.published += 1,
            ConvertOutcome::Skipped => self.skipped += 1,
            ConvertOutcome::Rejected => self.rejected += 1,
            ConvertOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.published + self.skipped + self.rejected + self.failed
    }
}
