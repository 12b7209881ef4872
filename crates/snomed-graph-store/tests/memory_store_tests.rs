use snomed_graph_store::constants::{FSN_TYPE_ID, IS_A_TYPE_ID, PREFERRED_TERM_TYPE_ID};
use snomed_graph_store::memory::MemoryStore;
use snomed_graph_store::{
    EntityKind, GraphStore, NewConcept, NewDescription, NewRelationship, StoreError,
};

fn concept(id: &str) -> NewConcept {
    NewConcept {
        id: id.to_string(),
        active: true,
        module_id: "core".to_string(),
        definition_status_id: "primitive".to_string(),
    }
}

fn description(id: &str, concept_id: &str, type_id: &str, term: &str) -> NewDescription {
    NewDescription {
        id: id.to_string(),
        concept_id: concept_id.to_string(),
        active: true,
        term: term.to_string(),
        type_id: type_id.to_string(),
        language_code: "en".to_string(),
    }
}

fn relationship(id: &str, source: &str, dest: &str, type_id: &str) -> NewRelationship {
    NewRelationship {
        id: id.to_string(),
        source_id: source.to_string(),
        destination_id: dest.to_string(),
        type_id: type_id.to_string(),
        characteristic_type_id: "stated".to_string(),
        modifier_id: "existential".to_string(),
        active: true,
    }
}

async fn seeded() -> MemoryStore {
    // Root <- Child1 <- Grandchild, Root <- Child2, plus one non-is-a edge.
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store
        .create_concepts(&[
            concept("root"),
            concept("child1"),
            concept("child2"),
            concept("grandchild"),
        ])
        .await
        .unwrap();
    store
        .create_descriptions(&[
            description("d-root", "root", FSN_TYPE_ID, "Root (finding)"),
            description("d-child1", "child1", FSN_TYPE_ID, "Child one (finding)"),
            description("d-child2", "child2", FSN_TYPE_ID, "Child two (finding)"),
            description("d-grand", "grandchild", PREFERRED_TERM_TYPE_ID, "Grandchild"),
        ])
        .await
        .unwrap();
    store
        .create_relationships(&[
            relationship("r1", "child1", "root", IS_A_TYPE_ID),
            relationship("r2", "child2", "root", IS_A_TYPE_ID),
            relationship("r3", "grandchild", "child1", IS_A_TYPE_ID),
            relationship("r4", "child1", "child2", "363698007"),
        ])
        .await
        .unwrap();
    store.materialize_hierarchy().await.unwrap();
    store
}

#[tokio::test]
async fn schema_initialization_is_idempotent() {
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();
}

#[tokio::test]
async fn duplicate_concept_id_violates_the_uniqueness_constraint() {
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store.create_concepts(&[concept("100")]).await.unwrap();

    let err = store
        .create_concepts(&[concept("100")])
        .await
        .unwrap_err();
    match err {
        StoreError::ConstraintViolation { kind, id } => {
            assert_eq!(kind, EntityKind::Concept);
            assert_eq!(id, "100");
        }
        other => panic!("expected ConstraintViolation, got {other}"),
    }
}

#[tokio::test]
async fn description_batch_referencing_missing_concept_fails_whole_batch() {
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store.create_concepts(&[concept("100")]).await.unwrap();

    let err = store
        .create_descriptions(&[
            description("d1", "100", FSN_TYPE_ID, "Known (finding)"),
            description("d2", "missing", FSN_TYPE_ID, "Dangling"),
        ])
        .await
        .unwrap_err();
    match err {
        StoreError::ReferentialIntegrity {
            missing,
            batch,
            first_missing,
        } => {
            assert_eq!(missing, 1);
            assert_eq!(batch, 2);
            assert_eq!(first_missing, "missing");
        }
        other => panic!("expected ReferentialIntegrity, got {other}"),
    }

    // Nothing from the failed batch was written, including the valid row.
    assert_eq!(store.description_count(), 0);
}

#[tokio::test]
async fn relationship_batch_with_unknown_endpoint_fails_whole_batch() {
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store
        .create_concepts(&[concept("100"), concept("200")])
        .await
        .unwrap();

    let err = store
        .create_relationships(&[
            relationship("r1", "100", "200", IS_A_TYPE_ID),
            relationship("r2", "100", "nope", IS_A_TYPE_ID),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ReferentialIntegrity { .. }), "{err}");
    assert_eq!(store.relationship_count(), 0);
}

#[tokio::test]
async fn materialization_derives_only_is_a_edges() {
    let store = seeded().await;
    // Three is-a rows, one finding-site row.
    assert_eq!(store.hierarchy_edge_count(), 3);
    assert_eq!(store.relationship_count(), 4);
}

#[tokio::test]
async fn rerunning_materialization_creates_nothing_new() {
    let store = seeded().await;
    let created = store.materialize_hierarchy().await.unwrap();
    assert_eq!(created, 0);
    assert_eq!(store.hierarchy_edge_count(), 3);
}

#[tokio::test]
async fn inactive_relationships_do_not_materialize() {
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store
        .create_concepts(&[concept("a"), concept("b")])
        .await
        .unwrap();
    let mut edge = relationship("r1", "a", "b", IS_A_TYPE_ID);
    edge.active = false;
    store.create_relationships(&[edge]).await.unwrap();

    assert_eq!(store.materialize_hierarchy().await.unwrap(), 0);
}

#[tokio::test]
async fn concept_lookup_returns_fsn_and_honors_soft_delete() {
    let store = seeded().await;

    let summary = store.concept("root").await.unwrap().unwrap();
    assert_eq!(summary.id, "root");
    assert!(summary.active);
    assert_eq!(summary.fsn.as_deref(), Some("Root (finding)"));

    store.set_soft_deleted(EntityKind::Concept, "root", true);
    assert!(store.concept("root").await.unwrap().is_none());

    // Explicitly-false marker stays visible (null-or-false convention).
    store.set_soft_deleted(EntityKind::Concept, "root", false);
    assert!(store.concept("root").await.unwrap().is_some());
}

#[tokio::test]
async fn preferred_term_filters_on_type_and_language() {
    let store = seeded().await;
    assert_eq!(
        store.preferred_term("grandchild", "en").await.unwrap(),
        Some("Grandchild".to_string())
    );
    assert_eq!(store.preferred_term("grandchild", "sv").await.unwrap(), None);
    // FSN rows never satisfy a preferred-term lookup.
    assert_eq!(store.preferred_term("root", "en").await.unwrap(), None);
}

#[tokio::test]
async fn traversals_follow_the_derived_hierarchy() {
    let store = seeded().await;

    assert_eq!(store.parents("grandchild").await.unwrap(), vec!["child1"]);
    assert_eq!(store.children("root").await.unwrap(), vec!["child1", "child2"]);
    assert_eq!(
        store.ancestors("grandchild").await.unwrap(),
        vec!["child1", "root"]
    );
    assert_eq!(
        store.descendants("root").await.unwrap(),
        vec!["child1", "child2", "grandchild"]
    );
}

#[tokio::test]
async fn subtype_check_is_transitive_and_irreflexive() {
    let store = seeded().await;
    assert!(store.is_subtype_of("grandchild", "root").await.unwrap());
    assert!(store.is_subtype_of("child1", "root").await.unwrap());
    assert!(!store.is_subtype_of("root", "grandchild").await.unwrap());
    assert!(!store.is_subtype_of("root", "root").await.unwrap());
    assert!(!store.is_subtype_of("ghost", "root").await.unwrap());
}

#[tokio::test]
async fn term_search_matches_substrings_with_a_limit() {
    let store = seeded().await;

    let hits = store.find_concepts("finding", 10).await.unwrap();
    assert_eq!(hits.len(), 3);

    let capped = store.find_concepts("finding", 2).await.unwrap();
    assert_eq!(capped.len(), 2);

    let one = store.find_concepts("Child one", 10).await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].id, "child1");
}

#[tokio::test]
async fn typed_relationship_retrieval_filters_by_type() {
    let store = seeded().await;

    let all = store.relationships_of("child1", None).await.unwrap();
    assert_eq!(all.len(), 2);

    let finding_site = store
        .relationships_of("child1", Some("363698007"))
        .await
        .unwrap();
    assert_eq!(finding_site.len(), 1);
    assert_eq!(finding_site[0].target_id, "child2");
}
