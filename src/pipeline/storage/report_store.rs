use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::common::constants::REPORTS_DIR;
use crate::common::error::Result;

/// `reports/<id>.json`: normalized filing trees kept across runs. A filing
/// found here is never fetched again.
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(REPORTS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self, report_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", report_id))
    }

    /// The saved tree, or `None` when absent or unreadable. A corrupt file is
    /// treated as absent so the filing is fetched again.
    pub fn load(&self, report_id: &str) -> Option<Value> {
        let path = self.path(report_id);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(tree) => Some(tree),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cached filing is corrupt; refetching");
                None
            }
        }
    }

    pub fn save(&self, report_id: &str, tree: &Value) -> Result<()> {
        fs::write(self.path(report_id), serde_json::to_vec(tree)?)?;
        Ok(())
    }
}
