//! Graph-store contract for snomed-graph.
//!
//! The loader and the slim reducer never assemble query text dynamically.
//! Instead, this crate defines [`GraphStore`], a fixed and closed set of
//! typed operations per entity and edge kind, and each backend implements
//! that enumerated table:
//!
//! - [`memory::MemoryStore`]: a full in-process property graph, used by the
//!   test suites and for embedded experiments.
//! - [`bolt::BoltStore`]: a Neo4j backend over `neo4rs`, one fixed
//!   parameterized Cypher statement per operation.
//!
//! The contract a backend must provide: uniqueness constraints and secondary
//! indexes (declared idempotently), bulk create keyed by a batch of
//! parameter rows, node lookup by unique property, and bulk conditional
//! delete with exact per-operation counts.

pub mod bolt;
pub mod closure;
pub mod constants;
pub mod memory;

use std::fmt;

use async_trait::async_trait;

/// Entity kinds subject to uniqueness constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Concept,
    Description,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Concept => "concept",
            EntityKind::Description => "description",
            EntityKind::Relationship => "relationship",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("uniqueness constraint violated: {kind} id {id:?} already exists")]
    ConstraintViolation { kind: EntityKind, id: String },

    /// A batch referenced concept ids not present in the store. The whole
    /// batch is rejected; nothing from it is written.
    #[error(
        "{missing} of {batch} rows reference concept ids not in the store (first missing: {first_missing:?})"
    )]
    ReferentialIntegrity {
        missing: usize,
        batch: usize,
        first_missing: String,
    },

    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("bolt driver error: {0}")]
    Bolt(#[from] neo4rs::Error),

    #[error("unexpected result shape from store: {0}")]
    ResultShape(String),
}

/// The nullable soft-delete marker, lifted to a three-state enum at the
/// data-model boundary. An entity is visible unless the marker is
/// explicitly set; `Unset` defaults to visible. The load/reduce core never
/// writes this marker (only downstream maintenance does), but every read
/// query must honor it through [`SoftDelete::is_visible`], the one
/// centralized visibility predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoftDelete {
    #[default]
    Unset,
    Active,
    Deleted,
}

impl SoftDelete {
    pub fn from_flag(is_deleted: Option<bool>) -> Self {
        match is_deleted {
            None => SoftDelete::Unset,
            Some(false) => SoftDelete::Active,
            Some(true) => SoftDelete::Deleted,
        }
    }

    pub fn is_visible(self) -> bool {
        !matches!(self, SoftDelete::Deleted)
    }
}

/// Bulk-create payload for a concept node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConcept {
    pub id: String,
    pub active: bool,
    pub module_id: String,
    pub definition_status_id: String,
}

/// Bulk-create payload for a description node plus its owning edge.
///
/// `concept_id` names the owning concept; the create operation matches it
/// by unique id and attaches the `HAS_DESCRIPTION` edge in the same
/// operation, so a description never exists without its edge at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDescription {
    pub id: String,
    pub concept_id: String,
    pub active: bool,
    pub term: String,
    pub type_id: String,
    pub language_code: String,
}

/// Bulk-create payload for a generic typed relationship edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub id: String,
    pub source_id: String,
    pub destination_id: String,
    pub type_id: String,
    pub characteristic_type_id: String,
    pub modifier_id: String,
    pub active: bool,
}

/// Read-plane result: a concept with its fully specified name, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptSummary {
    pub id: String,
    pub active: bool,
    pub fsn: Option<String>,
}

/// Read-plane result: a term-search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptMatch {
    pub id: String,
    pub term: String,
}

/// Read-plane result: one outgoing typed relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    pub type_id: String,
    pub target_id: String,
}

/// Session-scoped execution interface over the graph store.
///
/// Write-plane operations are *not* idempotent (bulk creates), so callers
/// never retry them blindly. Reduction-plane operations return exact
/// per-row counts. Read-plane operations treat soft-deleted entities as
/// absent.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ---- schema ----

    /// Declare uniqueness constraints (concept id, description id,
    /// relationship id) and secondary indexes (concept-active,
    /// description-term, relationship-type). Idempotent; must complete
    /// before any bulk write.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    // ---- write plane (bulk, batch-atomic) ----

    async fn create_concepts(&self, batch: &[NewConcept]) -> Result<u64, StoreError>;

    /// Creates each description and its owning edge in one operation. Every
    /// `concept_id` must resolve; otherwise the whole batch fails with
    /// [`StoreError::ReferentialIntegrity`].
    async fn create_descriptions(&self, batch: &[NewDescription]) -> Result<u64, StoreError>;

    /// Creates directed typed edges. Both endpoints of every row must
    /// resolve; otherwise the whole batch fails.
    async fn create_relationships(&self, batch: &[NewRelationship]) -> Result<u64, StoreError>;

    /// Materialize one hierarchy (`IS_A`) edge per active generic
    /// relationship whose type is the is-a constant. Guarded against
    /// duplication: re-running after a successful run creates nothing.
    /// Returns the number of edges created by this invocation.
    async fn materialize_hierarchy(&self) -> Result<u64, StoreError>;

    // ---- reduction plane (exact counts) ----

    /// Delete every generic relationship whose type is not allow-listed.
    async fn delete_relationships_not_in(
        &self,
        allowed_type_ids: &[String],
    ) -> Result<u64, StoreError>;

    /// Set the transient retained mark on the given concepts. Unknown ids
    /// are ignored; returns the number of concepts marked.
    async fn mark_concepts(&self, ids: &[String]) -> Result<u64, StoreError>;

    /// Extend the retained mark to every transitive subtype of an
    /// already-marked concept (hierarchy edge followed backward, unbounded
    /// depth). Returns the number of newly marked concepts.
    async fn mark_descendants_of_marked(&self) -> Result<u64, StoreError>;

    async fn count_unmarked_concepts(&self) -> Result<u64, StoreError>;

    /// Delete every generic and hierarchy edge touching an unmarked concept
    /// on either endpoint. Description-ownership edges are not touched
    /// here; they go with their descriptions.
    async fn delete_relationships_touching_unmarked(&self) -> Result<u64, StoreError>;

    /// Delete every description owned by an unmarked concept, together with
    /// its owning edge.
    async fn delete_descriptions_of_unmarked(&self) -> Result<u64, StoreError>;

    async fn delete_unmarked_concepts(&self) -> Result<u64, StoreError>;

    /// Defensive sweep: delete any description left without an owning edge,
    /// whether or not its owner still exists.
    async fn delete_orphan_descriptions(&self) -> Result<u64, StoreError>;

    /// Remove the retained mark from every concept that carries it. After
    /// this, no transient state is observable.
    async fn clear_marks(&self) -> Result<u64, StoreError>;

    // ---- read plane (soft-delete aware) ----

    async fn concept(&self, id: &str) -> Result<Option<ConceptSummary>, StoreError>;

    async fn preferred_term(
        &self,
        id: &str,
        language_code: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn parents(&self, id: &str) -> Result<Vec<String>, StoreError>;

    async fn children(&self, id: &str) -> Result<Vec<String>, StoreError>;

    async fn ancestors(&self, id: &str) -> Result<Vec<String>, StoreError>;

    async fn descendants(&self, id: &str) -> Result<Vec<String>, StoreError>;

    async fn is_subtype_of(&self, source_id: &str, target_id: &str) -> Result<bool, StoreError>;

    async fn find_concepts(&self, term: &str, limit: usize) -> Result<Vec<ConceptMatch>, StoreError>;

    async fn relationships_of(
        &self,
        id: &str,
        type_id: Option<&str>,
    ) -> Result<Vec<RelationshipInfo>, StoreError>;
}
