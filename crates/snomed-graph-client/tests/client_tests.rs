use snomed_graph_client::SnomedClient;
use snomed_graph_store::constants::{FSN_TYPE_ID, IS_A_TYPE_ID, PREFERRED_TERM_TYPE_ID};
use snomed_graph_store::memory::MemoryStore;
use snomed_graph_store::{GraphStore, NewConcept, NewDescription, NewRelationship};

async fn client() -> SnomedClient<MemoryStore> {
    let store = MemoryStore::new();
    store.ensure_schema().await.unwrap();
    store
        .create_concepts(&[
            NewConcept {
                id: "root".to_string(),
                active: true,
                module_id: "core".to_string(),
                definition_status_id: "primitive".to_string(),
            },
            NewConcept {
                id: "child".to_string(),
                active: true,
                module_id: "core".to_string(),
                definition_status_id: "primitive".to_string(),
            },
        ])
        .await
        .unwrap();
    store
        .create_descriptions(&[
            NewDescription {
                id: "d1".to_string(),
                concept_id: "root".to_string(),
                active: true,
                term: "Root (finding)".to_string(),
                type_id: FSN_TYPE_ID.to_string(),
                language_code: "en".to_string(),
            },
            NewDescription {
                id: "d2".to_string(),
                concept_id: "child".to_string(),
                active: true,
                term: "Child".to_string(),
                type_id: PREFERRED_TERM_TYPE_ID.to_string(),
                language_code: "en".to_string(),
            },
        ])
        .await
        .unwrap();
    store
        .create_relationships(&[NewRelationship {
            id: "r1".to_string(),
            source_id: "child".to_string(),
            destination_id: "root".to_string(),
            type_id: IS_A_TYPE_ID.to_string(),
            characteristic_type_id: "stated".to_string(),
            modifier_id: "existential".to_string(),
            active: true,
        }])
        .await
        .unwrap();
    store.materialize_hierarchy().await.unwrap();
    SnomedClient::new(store)
}

#[tokio::test]
async fn concept_lookup_carries_the_fsn() {
    let client = client().await;
    let summary = client.get_concept("root").await.unwrap().unwrap();
    assert_eq!(summary.fsn.as_deref(), Some("Root (finding)"));
    assert!(client.get_concept("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn preferred_term_falls_back_to_the_fsn() {
    let client = client().await;
    // Root has no synonym, only an FSN.
    assert_eq!(
        client.preferred_term("root").await.unwrap().as_deref(),
        Some("Root (finding)")
    );
    assert_eq!(
        client.preferred_term("child").await.unwrap().as_deref(),
        Some("Child")
    );
    assert_eq!(client.preferred_term_in("child", "sv").await.unwrap(), None);
}

#[tokio::test]
async fn hierarchy_reads_delegate_to_the_store() {
    let client = client().await;
    assert_eq!(client.parents("child").await.unwrap(), vec!["root"]);
    assert_eq!(client.children("root").await.unwrap(), vec!["child"]);
    assert!(client.is_subtype_of("child", "root").await.unwrap());
    assert_eq!(client.ancestors("child").await.unwrap(), vec!["root"]);
    assert_eq!(client.descendants("root").await.unwrap(), vec!["child"]);
}

#[tokio::test]
async fn search_is_bounded_by_the_default_limit() {
    let client = client().await;
    let hits = client.find_concepts("Root").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "root");
    assert!(client
        .find_concepts_limited("Root", 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn relationship_reads_filter_by_type() {
    let client = client().await;
    let all = client.relationships("child").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].target_id, "root");
    assert!(client
        .relationships_of_type("child", "363698007")
        .await
        .unwrap()
        .is_empty());
}
