use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::CaseSnapshot;

use super::{CaseChangeSet, CaseStore};

/// In-process store backing tests, the CLI, and embedded use.
///
/// One mutex over the whole map makes every commit atomic by
/// construction; per-case write serialization is the aggregate's job.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cases: Mutex<HashMap<Uuid, CaseSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_cases<T>(&self, f: impl FnOnce(&mut HashMap<Uuid, CaseSnapshot>) -> T) -> T {
        let mut cases = self
            .cases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut cases)
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn insert_case(&self, snapshot: CaseSnapshot) -> Result<(), StoreError> {
        self.with_cases(|cases| match cases.entry(snapshot.case.id) {
            Entry::Occupied(entry) => Err(StoreError::CaseExists {
                case_id: *entry.key(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(snapshot);
                Ok(())
            }
        })
    }

    async fn load_case(&self, case_id: Uuid) -> Result<Option<CaseSnapshot>, StoreError> {
        self.with_cases(|cases| Ok(cases.get(&case_id).cloned()))
    }

    async fn commit(&self, changes: CaseChangeSet) -> Result<(), StoreError> {
        self.with_cases(|cases| {
            let snapshot = cases
                .get_mut(&changes.case_id)
                .ok_or(StoreError::CaseMissing(changes.case_id))?;
            if snapshot.revision != changes.expected_revision {
                return Err(StoreError::RevisionConflict {
                    case_id: changes.case_id,
                    expected: changes.expected_revision,
                    found: snapshot.revision,
                });
            }
            changes.apply_to(snapshot);
            Ok(())
        })
    }

    async fn list_case_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        self.with_cases(|cases| Ok(cases.keys().copied().collect()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::error::StoreError;
    use crate::model::{Case, CaseSnapshot, CaseStatus};
    use crate::store::{CaseChangeSet, CaseStore};

    use super::MemoryStore;

    fn snapshot() -> CaseSnapshot {
        CaseSnapshot::new(Case {
            id: Uuid::new_v4(),
            jurisdiction: "US".to_string(),
            status: CaseStatus::Open,
            application_number: None,
            filing_date: None,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn insert_is_rejected_for_duplicate_ids() {
        let store = MemoryStore::new();
        let snap = snapshot();
        store.insert_case(snap.clone()).await.expect("first insert");

        let err = store
            .insert_case(snap)
            .await
            .expect_err("second insert must fail");
        assert!(matches!(err, StoreError::CaseExists { .. }));
    }

    #[tokio::test]
    async fn stale_commit_is_rejected_and_leaves_state_intact() {
        let store = MemoryStore::new();
        let snap = snapshot();
        let case_id = snap.case.id;
        store.insert_case(snap).await.expect("insert");

        store
            .commit(CaseChangeSet::new(case_id, 0))
            .await
            .expect("current-revision commit");

        let err = store
            .commit(CaseChangeSet::new(case_id, 0))
            .await
            .expect_err("replayed revision must conflict");
        assert!(matches!(err, StoreError::RevisionConflict { found: 1, .. }));

        let loaded = store.load_case(case_id).await.expect("load").expect("case");
        assert_eq!(loaded.revision, 1);
    }

    #[tokio::test]
    async fn load_returns_none_for_unknown_case() {
        let store = MemoryStore::new();
        let loaded = store.load_case(Uuid::new_v4()).await.expect("load");
        assert!(loaded.is_none());
    }
}
