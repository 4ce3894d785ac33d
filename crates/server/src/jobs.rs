//! Poll-able registry for background import and analysis jobs.
//!
//! The outer map lock is held only to insert or look up an entry; every
//! progress update takes just that job's own lock, so unrelated jobs never
//! contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

/// Lifecycle of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Done,
    Error,
}

/// Progress of one game-import job.
#[derive(Debug, Clone, Serialize)]
pub struct ImportJob {
    pub state: JobState,
    pub source: String,
    pub username: String,
    pub done: usize,
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

impl ImportJob {
    pub fn running(source: &str, username: &str) -> Self {
        ImportJob {
            state: JobState::Running,
            source: source.to_string(),
            username: username.to_string(),
            done: 0,
            total: 0,
            imported: 0,
            skipped: 0,
            error: None,
        }
    }
}

/// Progress of one analysis job.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeJob {
    pub state: JobState,
    pub username: String,
    pub games_done: usize,
    pub total_games: usize,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl AnalyzeJob {
    pub fn running(username: &str, total_games: usize) -> Self {
        AnalyzeJob {
            state: JobState::Running,
            username: username.to_string(),
            games_done: 0,
            total_games,
            result: None,
            error: None,
        }
    }
}

/// Concurrent job map with one lock per entry.
#[derive(Debug)]
pub struct JobRegistry<T> {
    jobs: RwLock<HashMap<String, Arc<RwLock<T>>>>,
}

impl<T: Clone> JobRegistry<T> {
    pub fn new() -> Self {
        JobRegistry {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new job under a fresh id.
    pub fn create(&self, job: T) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.insert(id.clone(), Arc::new(RwLock::new(job)));
        }
        id
    }

    /// Snapshot of a job's current status.
    pub fn get(&self, id: &str) -> Option<T> {
        let entry = self.jobs.read().ok()?.get(id).cloned()?;
        let job = entry.read().ok()?;
        Some(job.clone())
    }

    /// Apply `update` to one job's status under its own lock. Updates for
    /// unknown ids are dropped silently; the job may have been created by
    /// a process that has since restarted.
    pub fn update(&self, id: &str, update: impl FnOnce(&mut T)) {
        let entry = match self.jobs.read() {
            Ok(jobs) => jobs.get(id).cloned(),
            Err(_) => None,
        };
        if let Some(entry) = entry {
            if let Ok(mut job) = entry.write() {
                update(&mut job);
            }
        }
    }
}

impl<T: Clone> Default for JobRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handles layered into the router as extensions.
pub type ImportJobs = Arc<JobRegistry<ImportJob>>;
pub type AnalyzeJobs = Arc<JobRegistry<AnalyzeJob>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_returns_snapshot() {
        let registry = JobRegistry::new();
        let id = registry.create(ImportJob::running("lichess", "alice"));
        let job = registry.get(&id).unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.username, "alice");
        assert_eq!(job.done, 0);
    }

    #[test]
    fn unknown_id_is_none_and_update_is_dropped() {
        let registry: JobRegistry<ImportJob> = JobRegistry::new();
        assert!(registry.get("nope").is_none());
        registry.update("nope", |job| job.done = 99);
    }

    #[test]
    fn updates_are_visible_to_later_gets() {
        let registry = JobRegistry::new();
        let id = registry.create(AnalyzeJob::running("bob", 7));
        registry.update(&id, |job| {
            job.games_done = 3;
        });
        registry.update(&id, |job| {
            job.state = JobState::Done;
            job.result = Some(serde_json::json!({"games": 7}));
        });

        let job = registry.get(&id).unwrap();
        assert_eq!(job.games_done, 3);
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.result.unwrap()["games"], 7);
    }

    #[test]
    fn ids_are_distinct_per_job() {
        let registry = JobRegistry::new();
        let a = registry.create(ImportJob::running("lichess", "alice"));
        let b = registry.create(ImportJob::running("chesscom", "bob"));
        assert_ne!(a, b);
        assert_eq!(registry.get(&a).unwrap().username, "alice");
        assert_eq!(registry.get(&b).unwrap().username, "bob");
    }
}
