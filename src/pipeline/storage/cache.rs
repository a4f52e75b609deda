use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use crate::common::constants::ROSTER_FILE;
use crate::common::error::{Result, ScraperError};
use crate::common::types::Roster;
use crate::observability::metrics;

/// What the operator asked for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheDirective {
    /// Decide from the snapshot's age.
    #[default]
    Auto,
    Reload,
    FromCache,
}

impl CacheDirective {
    pub fn from_flags(reload: bool, from_cache: bool) -> Self {
        match (reload, from_cache) {
            (true, _) => CacheDirective::Reload,
            (false, true) => CacheDirective::FromCache,
            (false, false) => CacheDirective::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    Missing,
    Requested,
    Stale { age: Duration },
}

/// Where this run's roster comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Fresh,
    Rebuild(RebuildReason),
}

impl CacheDecision {
    fn label(&self) -> &'static str {
        match self {
            CacheDecision::Fresh => "fresh",
            CacheDecision::Rebuild(RebuildReason::Missing) => "missing",
            CacheDecision::Rebuild(RebuildReason::Requested) => "reload",
            CacheDecision::Rebuild(RebuildReason::Stale { .. }) => "stale",
        }
    }
}

/// Owns the roster snapshot file. Its modification time is the freshness clock.
pub struct RosterCache {
    path: PathBuf,
    max_age: Duration,
}

impl RosterCache {
    pub fn new(output_dir: &Path, max_age: Duration) -> Self {
        Self {
            path: output_dir.join(ROSTER_FILE),
            max_age,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn decide(&self, directive: CacheDirective) -> CacheDecision {
        self.decide_at(directive, SystemTime::now())
    }

    /// Decide against an explicit clock.
    pub fn decide_at(&self, directive: CacheDirective, now: SystemTime) -> CacheDecision {
        let decision = match (fs::metadata(&self.path), directive) {
            (Err(_), _) => CacheDecision::Rebuild(RebuildReason::Missing),
            (Ok(_), CacheDirective::Reload) => CacheDecision::Rebuild(RebuildReason::Requested),
            (Ok(_), CacheDirective::FromCache) => CacheDecision::Fresh,
            (Ok(meta), CacheDirective::Auto) => {
                // An unreadable mtime is treated as infinitely old.
                let age = meta
                    .modified()
                    .map(|mtime| now.duration_since(mtime).unwrap_or_default())
                    .unwrap_or(Duration::MAX);
                if age > self.max_age {
                    CacheDecision::Rebuild(RebuildReason::Stale { age })
                } else {
                    CacheDecision::Fresh
                }
            }
        };
        metrics::cache::decision(decision.label());
        info!(path = %self.path.display(), decision = decision.label(), "Roster cache decision");
        decision
    }

    /// Read the snapshot. Any failure is fatal for the run.
    pub fn load(&self) -> Result<Roster> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            ScraperError::Cache(format!(
                "Could not get committee data from {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let roster: Roster = serde_json::from_str(&content).map_err(|e| {
            ScraperError::Cache(format!(
                "Committee data cached in {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!(committees = roster.len(), "Loaded roster snapshot");
        Ok(roster)
    }

    /// Replace the snapshot through a temporary file and a rename, so readers
    /// never see a partial document.
    pub fn save(&self, roster: &Roster) -> Result<()> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let payload = serde_json::to_vec(roster)?;
            let tmp = self.path.with_extension("json.tmp");
            fs::write(&tmp, payload)?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            ScraperError::Cache(format!("Could not write {}: {}", self.path.display(), e))
        })?;
        info!(path = %self.path.display(), committees = roster.len(), "Saved roster snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(dir: &Path) -> RosterCache {
        RosterCache::new(dir, Duration::from_secs(60 * 60))
    }

    #[test]
    fn missing_snapshot_always_rebuilds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        for directive in [CacheDirective::Auto, CacheDirective::Reload, CacheDirective::FromCache] {
            assert_eq!(
                cache.decide(directive),
                CacheDecision::Rebuild(RebuildReason::Missing)
            );
        }
    }

    #[test]
    fn directives_override_age() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        cache.save(&Roster::default()).unwrap();
        let later = SystemTime::now() + Duration::from_secs(7 * 24 * 60 * 60);

        assert_eq!(
            cache.decide(CacheDirective::Reload),
            CacheDecision::Rebuild(RebuildReason::Requested)
        );
        assert_eq!(cache.decide_at(CacheDirective::FromCache, later), CacheDecision::Fresh);
        assert_eq!(cache.decide(CacheDirective::Auto), CacheDecision::Fresh);
        assert!(matches!(
            cache.decide_at(CacheDirective::Auto, later),
            CacheDecision::Rebuild(RebuildReason::Stale { .. })
        ));
    }

    #[test]
    fn corrupt_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        fs::write(cache.path(), "{not json").unwrap();
        let err = cache.load().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn save_then_load_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        cache.save(&Roster::default()).unwrap();
        assert!(cache.load().unwrap().is_empty());
        assert!(!cache.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn flags_map_to_directives() {
        assert_eq!(CacheDirective::from_flags(false, false), CacheDirective::Auto);
        assert_eq!(CacheDirective::from_flags(true, false), CacheDirective::Reload);
        assert_eq!(CacheDirective::from_flags(false, true), CacheDirective::FromCache);
    }
}
