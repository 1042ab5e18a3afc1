use std::sync::Arc;

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{KeyValueStore, Result};
use crate::report::{ExamResult, RecentActivity};

pub const EXAM_RESULTS_KEY: &str = "examResults";
pub const RECENT_ACTIVITIES_KEY: &str = "recentActivities";
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Newest-first history lists kept as JSON text under fixed keys.
#[derive(Clone)]
pub struct ResultArchive {
    store: Arc<dyn KeyValueStore>,
}

impl ResultArchive {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn exam_results(&self) -> Result<Vec<ExamResult>> {
        self.load(EXAM_RESULTS_KEY)
    }

    pub fn recent_activities(&self) -> Result<Vec<RecentActivity>> {
        self.load(RECENT_ACTIVITIES_KEY)
    }

    pub fn record_result(&self, result: &ExamResult) -> Result<()> {
        let mut results = self.exam_results()?;
        results.insert(0, result.clone());
        self.save(EXAM_RESULTS_KEY, &results)?;
        info!("💾 Stored exam result {} ({} in history)", result.id, results.len());
        Ok(())
    }

    pub fn record_activity(&self, activity: RecentActivity) -> Result<()> {
        let mut activities = self.recent_activities()?;
        activities.insert(0, activity);
        activities.truncate(RECENT_ACTIVITY_LIMIT);
        self.save(RECENT_ACTIVITIES_KEY, &activities)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        self.store.set(key, serde_json::to_string(items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::SessionCounters;
    use crate::report::{build_result, ResultInput};
    use crate::storage::MemoryStore;

    fn result_for(exam_id: &str, tab_switches: u32) -> ExamResult {
        build_result(ResultInput {
            exam_id,
            questions: &[],
            warnings: &[],
            counters: SessionCounters {
                tab_switches,
                ..SessionCounters::default()
            },
            ai_detected: false,
            time_taken_secs: 10,
        })
    }

    #[test]
    fn test_results_are_prepended() {
        let archive = ResultArchive::new(Arc::new(MemoryStore::new()));
        archive.record_result(&result_for("first", 0)).unwrap();
        archive.record_result(&result_for("second", 0)).unwrap();

        let results = archive.exam_results().unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.exam_id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[test]
    fn test_recent_activities_capped_at_ten() {
        let archive = ResultArchive::new(Arc::new(MemoryStore::new()));
        for i in 0..12 {
            let result = result_for(&format!("exam-{}", i), 1);
            archive.record_activity(RecentActivity::high_risk(&result)).unwrap();
        }

        let activities = archive.recent_activities().unwrap();
        assert_eq!(activities.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(activities[0].exam_id, "exam-11");
        assert_eq!(activities[9].exam_id, "exam-2");
    }
}
