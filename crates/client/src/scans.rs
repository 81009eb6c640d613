//! Recent crop photo analyses kept on the device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::types::CropImageAnalysis;
use crate::store::{Store, keys};

/// Scans kept; older ones are dropped.
pub const MAX_SCANS: usize = 10;

/// One analysed photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropScan {
    pub id: String,
    pub scanned_at: DateTime<Utc>,
    pub image_name: String,
    pub analysis: CropImageAnalysis,
    /// Whether the analysis was generated offline.
    #[serde(default)]
    pub offline: bool,
}

impl CropScan {
    #[must_use]
    pub fn new(image_name: impl Into<String>, analysis: CropImageAnalysis, offline: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scanned_at: Utc::now(),
            image_name: image_name.into(),
            analysis,
            offline,
        }
    }
}

/// Newest-first scan list, persisted in the store.
#[derive(Debug, Clone)]
pub struct ScanHistory {
    store: Store,
}

impl ScanHistory {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Put `scan` at the front, evicting the oldest beyond [`MAX_SCANS`].
    pub fn record(&self, scan: CropScan) {
        let mut scans = self.list();
        scans.insert(0, scan);
        scans.truncate(MAX_SCANS);
        self.store.set(keys::CROP_SCANS, &scans);
    }

    /// Scans, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<CropScan> {
        self.store.get(keys::CROP_SCANS).unwrap_or_default()
    }

    pub fn clear(&self) {
        self.store.remove(keys::CROP_SCANS);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::api::mock;

    #[test]
    fn test_newest_first_and_capped() {
        let history = ScanHistory::new(Store::in_memory());
        let mut rng = StdRng::seed_from_u64(1);

        for i in 0..12 {
            let analysis = mock::crop_image_analysis(Some("wheat"), &mut rng);
            history.record(CropScan::new(format!("leaf-{i}.jpg"), analysis, true));
        }

        let scans = history.list();
        assert_eq!(scans.len(), MAX_SCANS);
        assert_eq!(scans.first().map(|s| s.image_name.as_str()), Some("leaf-11.jpg"));
        assert_eq!(scans.last().map(|s| s.image_name.as_str()), Some("leaf-2.jpg"));

        history.clear();
        assert!(history.list().is_empty());
    }
}
