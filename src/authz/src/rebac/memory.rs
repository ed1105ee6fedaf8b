//! In-memory relationship store for tests and development
//!
//! Only direct tuples are checked; there is no userset or graph traversal.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use acx_core::{Capability, CapabilitySet, Result};

use super::adapter::RebacAdapter;
use super::types::{
    RebacCallOptions, RebacCheckInput, RebacCheckResult, RebacListObjectsInput,
    RebacListObjectsResult, RebacListSubjectsInput, RebacListSubjectsResult, RelationshipObject,
    RelationshipSubject, RelationshipTuple,
};

/// Identity of a stored tuple; the tenant is part of the key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TupleKey {
    tenant_id: String,
    object_type: String,
    object_id: String,
    relation: String,
    subject_type: String,
    subject_id: String,
    subject_relation: String,
}

impl TupleKey {
    fn of(tuple: &RelationshipTuple) -> Self {
        Self {
            tenant_id: tuple.tenant_id.clone().unwrap_or_default(),
            object_type: tuple.object.object_type.clone(),
            object_id: tuple.object.id.clone(),
            relation: tuple.relation.clone(),
            subject_type: tuple.subject.subject_type.clone(),
            subject_id: tuple.subject.id.clone(),
            subject_relation: tuple.subject.relation.clone().unwrap_or_default(),
        }
    }
}

/// Tuples without a tenant inherit `fallback`
fn normalize_tuple(mut tuple: RelationshipTuple, fallback: Option<&str>) -> RelationshipTuple {
    let missing = tuple.tenant_id.as_deref().map_or(true, str::is_empty);
    if missing {
        tuple.tenant_id = fallback.filter(|t| !t.is_empty()).map(str::to_string);
    }
    tuple
}

/// Direct-tuple ReBAC adapter
pub struct InMemoryRebacAdapter {
    tuples: Arc<RwLock<HashMap<TupleKey, RelationshipTuple>>>,
}

impl InMemoryRebacAdapter {
    pub fn new() -> Self {
        Self {
            tuples: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.tuples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tuples.read().await.is_empty()
    }
}

impl Default for InMemoryRebacAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RebacAdapter for InMemoryRebacAdapter {
    async fn write_tuples(
        &self,
        tuples: Vec<RelationshipTuple>,
        options: &RebacCallOptions,
    ) -> Result<()> {
        let fallback = options.tenant_id.as_deref();
        let mut store = self.tuples.write().await;

        for tuple in tuples {
            let tuple = normalize_tuple(tuple, fallback);
            store.insert(TupleKey::of(&tuple), tuple);
        }

        debug!(tuples = store.len(), "Wrote relationship tuples");
        Ok(())
    }

    async fn check(
        &self,
        input: &RebacCheckInput,
        options: &RebacCallOptions,
    ) -> Result<RebacCheckResult> {
        let tenant_id = input.tenant_id.as_deref().or(options.tenant_id.as_deref());

        let wanted = RelationshipTuple::new(
            input.object.clone(),
            input.relation.clone(),
            input.subject.clone(),
        );
        let key = TupleKey::of(&normalize_tuple(wanted, tenant_id));

        if self.tuples.read().await.contains_key(&key) {
            return Ok(RebacCheckResult::allowed());
        }

        let contextual = input
            .contextual_tuples
            .iter()
            .any(|tuple| TupleKey::of(&normalize_tuple(tuple.clone(), tenant_id)) == key);

        Ok(if contextual {
            RebacCheckResult::allowed()
        } else {
            RebacCheckResult::denied()
        })
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::ListObjects)
            .with(Capability::ListSubjects)
    }

    async fn list_objects(
        &self,
        input: &RebacListObjectsInput,
        options: &RebacCallOptions,
    ) -> Result<RebacListObjectsResult> {
        let tenant = input
            .tenant_id
            .as_deref()
            .or(options.tenant_id.as_deref())
            .unwrap_or_default();
        let subject_relation = input.subject.relation.as_deref().unwrap_or_default();

        let store = self.tuples.read().await;
        let mut objects: Vec<RelationshipObject> = store
            .iter()
            .filter(|(key, _)| {
                key.tenant_id == tenant
                    && key.object_type == input.object_type
                    && key.relation == input.relation
                    && key.subject_type == input.subject.subject_type
                    && key.subject_id == input.subject.id
                    && key.subject_relation == subject_relation
            })
            .map(|(_, tuple)| tuple.object.clone())
            .collect();

        objects.sort_by(|a, b| a.id.cmp(&b.id));
        objects.dedup();
        if let Some(limit) = input.limit {
            objects.truncate(limit);
        }

        Ok(RebacListObjectsResult {
            objects,
            trace: None,
        })
    }

    async fn list_subjects(
        &self,
        input: &RebacListSubjectsInput,
        options: &RebacCallOptions,
    ) -> Result<RebacListSubjectsResult> {
        let tenant = input
            .tenant_id
            .as_deref()
            .or(options.tenant_id.as_deref())
            .unwrap_or_default();

        let store = self.tuples.read().await;
        let mut subjects: Vec<RelationshipSubject> = store
            .iter()
            .filter(|(key, _)| {
                key.tenant_id == tenant
                    && key.object_type == input.object.object_type
                    && key.object_id == input.object.id
                    && key.relation == input.relation
                    && key.subject_type == input.subject_type
            })
            .map(|(_, tuple)| tuple.subject.clone())
            .collect();

        subjects.sort_by(|a, b| (&a.id, &a.relation).cmp(&(&b.id, &b.relation)));
        subjects.dedup();
        if let Some(limit) = input.limit {
            subjects.truncate(limit);
        }

        Ok(RebacListSubjectsResult {
            subjects,
            trace: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(doc: &str, user: &str) -> RelationshipTuple {
        RelationshipTuple::new(
            RelationshipObject::new("doc", doc),
            "viewer",
            RelationshipSubject::new("user", user),
        )
    }

    fn check_input(doc: &str, user: &str) -> RebacCheckInput {
        RebacCheckInput::new(
            RelationshipObject::new("doc", doc),
            "viewer",
            RelationshipSubject::new("user", user),
        )
    }

    #[tokio::test]
    async fn test_direct_tuple_check() {
        let adapter = InMemoryRebacAdapter::new();
        let options = RebacCallOptions::default();

        adapter.write_tuples(vec![viewer("d1", "u1")], &options).await.unwrap();

        assert!(adapter.check(&check_input("d1", "u1"), &options).await.unwrap().allow);
        assert!(!adapter.check(&check_input("d1", "u2"), &options).await.unwrap().allow);
        assert!(!adapter.check(&check_input("d2", "u1"), &options).await.unwrap().allow);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let adapter = InMemoryRebacAdapter::new();
        let t1 = RebacCallOptions {
            tenant_id: Some("t1".into()),
            ..Default::default()
        };

        // Tuple inherits the call's tenant
        adapter.write_tuples(vec![viewer("d1", "u1")], &t1).await.unwrap();

        assert!(adapter.check(&check_input("d1", "u1"), &t1).await.unwrap().allow);
        assert!(
            adapter
                .check(&check_input("d1", "u1").with_tenant("t1"), &RebacCallOptions::default())
                .await
                .unwrap()
                .allow
        );
        assert!(
            !adapter
                .check(&check_input("d1", "u1").with_tenant("t2"), &RebacCallOptions::default())
                .await
                .unwrap()
                .allow
        );
        assert!(
            !adapter
                .check(&check_input("d1", "u1"), &RebacCallOptions::default())
                .await
                .unwrap()
                .allow
        );
    }

    #[tokio::test]
    async fn test_contextual_tuples_are_not_persisted() {
        let adapter = InMemoryRebacAdapter::new();
        let options = RebacCallOptions::default();

        let input = check_input("d1", "u1").with_contextual_tuple(viewer("d1", "u1"));
        assert!(adapter.check(&input, &options).await.unwrap().allow);

        assert!(!adapter.check(&check_input("d1", "u1"), &options).await.unwrap().allow);
        assert!(adapter.is_empty().await);
    }

    #[tokio::test]
    async fn test_userset_subject_is_distinct() {
        let adapter = InMemoryRebacAdapter::new();
        let options = RebacCallOptions::default();
        let tuple = RelationshipTuple::new(
            RelationshipObject::new("doc", "d1"),
            "viewer",
            RelationshipSubject::new("group", "eng").with_relation("member"),
        );
        adapter.write_tuples(vec![tuple], &options).await.unwrap();

        let plain = RebacCheckInput::new(
            RelationshipObject::new("doc", "d1"),
            "viewer",
            RelationshipSubject::new("group", "eng"),
        );
        assert!(!adapter.check(&plain, &options).await.unwrap().allow);
    }

    #[tokio::test]
    async fn test_list_objects_and_subjects() {
        let adapter = InMemoryRebacAdapter::new();
        let options = RebacCallOptions::default();
        adapter
            .write_tuples(
                vec![
                    viewer("d2", "u1"),
                    viewer("d1", "u1"),
                    viewer("d1", "u2"),
                    viewer("d1", "u1"),
                ],
                &options,
            )
            .await
            .unwrap();
        assert_eq!(adapter.len().await, 3);

        let objects = adapter
            .list_objects(
                &RebacListObjectsInput {
                    object_type: "doc".into(),
                    relation: "viewer".into(),
                    subject: RelationshipSubject::new("user", "u1"),
                    tenant_id: None,
                    limit: None,
                },
                &options,
            )
            .await
            .unwrap();
        let ids: Vec<_> = objects.objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);

        let subjects = adapter
            .list_subjects(
                &RebacListSubjectsInput {
                    object: RelationshipObject::new("doc", "d1"),
                    relation: "viewer".into(),
                    subject_type: "user".into(),
                    tenant_id: None,
                    limit: Some(1),
                },
                &options,
            )
            .await
            .unwrap();
        assert_eq!(subjects.subjects, vec![RelationshipSubject::new("user", "u1")]);
    }
}
