//! Read-side client over a loaded graph.
//!
//! A thin, owned wrapper around any [`GraphStore`] exposing only the read
//! plane, with the SNOMED defaults applied: English preferred terms and a
//! bounded search limit. Soft-deleted entities are invisible through every
//! method, inherited from the store contract.

use snomed_graph_store::{
    ConceptMatch, ConceptSummary, GraphStore, RelationshipInfo, StoreError,
};

/// Default language for preferred-term lookups.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default cap on term-search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 25;

pub struct SnomedClient<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> SnomedClient<S> {
    pub fn new(store: S) -> Self {
        SnomedClient { store }
    }

    /// The wrapped store, for callers that also need the write plane.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get_concept(&self, id: &str) -> Result<Option<ConceptSummary>, StoreError> {
        self.store.concept(id).await
    }

    /// English preferred term, falling back to the fully specified name.
    pub async fn preferred_term(&self, id: &str) -> Result<Option<String>, StoreError> {
        if let Some(term) = self.store.preferred_term(id, DEFAULT_LANGUAGE).await? {
            return Ok(Some(term));
        }
        Ok(self.store.concept(id).await?.and_then(|c| c.fsn))
    }

    pub async fn preferred_term_in(
        &self,
        id: &str,
        language_code: &str,
    ) -> Result<Option<String>, StoreError> {
        self.store.preferred_term(id, language_code).await
    }

    pub async fn parents(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.store.parents(id).await
    }

    pub async fn children(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.store.children(id).await
    }

    pub async fn ancestors(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.store.ancestors(id).await
    }

    pub async fn descendants(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.store.descendants(id).await
    }

    pub async fn is_subtype_of(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<bool, StoreError> {
        self.store.is_subtype_of(source_id, target_id).await
    }

    pub async fn find_concepts(&self, term: &str) -> Result<Vec<ConceptMatch>, StoreError> {
        self.store.find_concepts(term, DEFAULT_SEARCH_LIMIT).await
    }

    pub async fn find_concepts_limited(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConceptMatch>, StoreError> {
        self.store.find_concepts(term, limit).await
    }

    pub async fn relationships(&self, id: &str) -> Result<Vec<RelationshipInfo>, StoreError> {
        self.store.relationships_of(id, None).await
    }

    pub async fn relationships_of_type(
        &self,
        id: &str,
        type_id: &str,
    ) -> Result<Vec<RelationshipInfo>, StoreError> {
        self.store.relationships_of(id, Some(type_id)).await
    }
}
