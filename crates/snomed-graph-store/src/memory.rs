//! In-process property-graph backend.
//!
//! Implements the full [`GraphStore`] operation table against plain maps
//! and sets behind a `parking_lot::RwLock`. Uniqueness constraints are
//! enforced on create, dependent creates are validated before anything is
//! applied (so a failed batch writes nothing), and description ownership is
//! a real edge (`owned_by`) distinct from node attributes, which is what
//! makes the orphan sweep testable.
//!
//! This backend is the reference implementation for the test suites; the
//! Bolt backend mirrors its semantics statement by statement.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::closure::reachable;
use crate::constants::{FSN_TYPE_ID, IS_A_TYPE_ID, PREFERRED_TERM_TYPE_ID};
use crate::{
    ConceptMatch, ConceptSummary, EntityKind, GraphStore, NewConcept, NewDescription,
    NewRelationship, RelationshipInfo, SoftDelete, StoreError,
};

#[derive(Debug, Clone)]
struct ConceptNode {
    active: bool,
    #[allow(dead_code)]
    module_id: String,
    #[allow(dead_code)]
    definition_status_id: String,
    deleted: SoftDelete,
    /// The transient retained mark (`keep` in the Bolt backend). `None`
    /// outside a slim reduction run.
    retained: Option<bool>,
}

#[derive(Debug, Clone)]
struct DescriptionNode {
    active: bool,
    term: String,
    type_id: String,
    language_code: String,
    deleted: SoftDelete,
}

#[derive(Debug, Clone)]
struct RelationshipEdge {
    source_id: String,
    destination_id: String,
    type_id: String,
    characteristic_type_id: String,
    modifier_id: String,
    active: bool,
    deleted: SoftDelete,
}

#[derive(Default)]
struct Graph {
    schema_declared: bool,
    concepts: HashMap<String, ConceptNode>,
    descriptions: HashMap<String, DescriptionNode>,
    /// Generic typed edges, keyed by relationship id.
    relationships: HashMap<String, RelationshipEdge>,
    /// `HAS_DESCRIPTION` edges: description id -> owning concept id.
    owned_by: HashMap<String, String>,
    /// Derived hierarchy edges: (subtype, supertype).
    hierarchy: HashSet<(String, String)>,
}

impl Graph {
    fn retained(&self, id: &str) -> bool {
        self.concepts
            .get(id)
            .is_some_and(|c| c.retained == Some(true))
    }

    fn visible_concept(&self, id: &str) -> Option<&ConceptNode> {
        self.concepts.get(id).filter(|c| c.deleted.is_visible())
    }

    /// Adjacency in the descendant direction: supertype -> subtypes.
    fn subtype_adjacency(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (sub, sup) in &self.hierarchy {
            map.entry(sup.clone()).or_default().push(sub.clone());
        }
        map
    }

    /// Adjacency in the ancestor direction: subtype -> supertypes.
    fn supertype_adjacency(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (sub, sup) in &self.hierarchy {
            map.entry(sub.clone()).or_default().push(sup.clone());
        }
        map
    }
}

/// In-memory [`GraphStore`] backend.
#[derive(Default)]
pub struct MemoryStore {
    graph: RwLock<Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a description's owning edge without touching the node.
    ///
    /// Out-of-band maintenance hook: this deliberately violates the
    /// "description never exists without its owning edge" invariant so the
    /// reducer's defensive orphan sweep has something to repair.
    pub fn detach_description(&self, description_id: &str) -> bool {
        self.graph.write().owned_by.remove(description_id).is_some()
    }

    /// Set or clear the soft-delete marker on an entity. The load/reduce
    /// core never calls this; downstream maintenance does, and the read
    /// plane must then treat the entity as absent.
    pub fn set_soft_deleted(&self, kind: EntityKind, id: &str, deleted: bool) -> bool {
        let flag = SoftDelete::from_flag(Some(deleted));
        let mut graph = self.graph.write();
        match kind {
            EntityKind::Concept => graph
                .concepts
                .get_mut(id)
                .map(|c| c.deleted = flag)
                .is_some(),
            EntityKind::Description => graph
                .descriptions
                .get_mut(id)
                .map(|d| d.deleted = flag)
                .is_some(),
            EntityKind::Relationship => graph
                .relationships
                .get_mut(id)
                .map(|r| r.deleted = flag)
                .is_some(),
        }
    }

    /// Concept ids currently carrying the transient retained mark. Empty
    /// after any successful reduction.
    pub fn marked_concept_ids(&self) -> Vec<String> {
        let graph = self.graph.read();
        let mut ids: Vec<String> = graph
            .concepts
            .iter()
            .filter(|(_, c)| c.retained.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn concept_count(&self) -> u64 {
        self.graph.read().concepts.len() as u64
    }

    pub fn description_count(&self) -> u64 {
        self.graph.read().descriptions.len() as u64
    }

    pub fn relationship_count(&self) -> u64 {
        self.graph.read().relationships.len() as u64
    }

    pub fn hierarchy_edge_count(&self) -> u64 {
        self.graph.read().hierarchy.len() as u64
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        // Uniqueness is always enforced by the keyed maps; this just mirrors
        // the idempotent declaration step of the Bolt backend.
        self.graph.write().schema_declared = true;
        Ok(())
    }

    async fn create_concepts(&self, batch: &[NewConcept]) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();

        let mut in_batch: HashSet<&str> = HashSet::new();
        for row in batch {
            if graph.concepts.contains_key(&row.id) || !in_batch.insert(row.id.as_str()) {
                return Err(StoreError::ConstraintViolation {
                    kind: EntityKind::Concept,
                    id: row.id.clone(),
                });
            }
        }

        for row in batch {
            graph.concepts.insert(
                row.id.clone(),
                ConceptNode {
                    active: row.active,
                    module_id: row.module_id.clone(),
                    definition_status_id: row.definition_status_id.clone(),
                    deleted: SoftDelete::Unset,
                    retained: None,
                },
            );
        }
        Ok(batch.len() as u64)
    }

    async fn create_descriptions(&self, batch: &[NewDescription]) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();

        let mut in_batch: HashSet<&str> = HashSet::new();
        for row in batch {
            if graph.descriptions.contains_key(&row.id) || !in_batch.insert(row.id.as_str()) {
                return Err(StoreError::ConstraintViolation {
                    kind: EntityKind::Description,
                    id: row.id.clone(),
                });
            }
        }

        let missing: Vec<&str> = batch
            .iter()
            .filter(|row| !graph.concepts.contains_key(&row.concept_id))
            .map(|row| row.concept_id.as_str())
            .collect();
        if let Some(first) = missing.first() {
            return Err(StoreError::ReferentialIntegrity {
                missing: missing.len(),
                batch: batch.len(),
                first_missing: first.to_string(),
            });
        }

        for row in batch {
            graph.descriptions.insert(
                row.id.clone(),
                DescriptionNode {
                    active: row.active,
                    term: row.term.clone(),
                    type_id: row.type_id.clone(),
                    language_code: row.language_code.clone(),
                    deleted: SoftDelete::Unset,
                },
            );
            graph.owned_by.insert(row.id.clone(), row.concept_id.clone());
        }
        Ok(batch.len() as u64)
    }

    async fn create_relationships(&self, batch: &[NewRelationship]) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();

        let mut in_batch: HashSet<&str> = HashSet::new();
        for row in batch {
            if graph.relationships.contains_key(&row.id) || !in_batch.insert(row.id.as_str()) {
                return Err(StoreError::ConstraintViolation {
                    kind: EntityKind::Relationship,
                    id: row.id.clone(),
                });
            }
        }

        let missing: Vec<&str> = batch
            .iter()
            .flat_map(|row| [row.source_id.as_str(), row.destination_id.as_str()])
            .filter(|id| !graph.concepts.contains_key(*id))
            .collect();
        if let Some(first) = missing.first() {
            return Err(StoreError::ReferentialIntegrity {
                missing: missing.len(),
                batch: batch.len(),
                first_missing: first.to_string(),
            });
        }

        for row in batch {
            graph.relationships.insert(
                row.id.clone(),
                RelationshipEdge {
                    source_id: row.source_id.clone(),
                    destination_id: row.destination_id.clone(),
                    type_id: row.type_id.clone(),
                    characteristic_type_id: row.characteristic_type_id.clone(),
                    modifier_id: row.modifier_id.clone(),
                    active: row.active,
                    deleted: SoftDelete::Unset,
                },
            );
        }
        Ok(batch.len() as u64)
    }

    async fn materialize_hierarchy(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let edges: Vec<(String, String)> = graph
            .relationships
            .values()
            .filter(|r| r.active && r.type_id == IS_A_TYPE_ID)
            .map(|r| (r.source_id.clone(), r.destination_id.clone()))
            .collect();

        let mut created = 0u64;
        for edge in edges {
            if graph.hierarchy.insert(edge) {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn delete_relationships_not_in(
        &self,
        allowed_type_ids: &[String],
    ) -> Result<u64, StoreError> {
        let allowed: HashSet<&str> = allowed_type_ids.iter().map(String::as_str).collect();
        let mut graph = self.graph.write();
        let before = graph.relationships.len();
        graph
            .relationships
            .retain(|_, edge| allowed.contains(edge.type_id.as_str()));
        Ok((before - graph.relationships.len()) as u64)
    }

    async fn mark_concepts(&self, ids: &[String]) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let mut marked = 0u64;
        for id in ids {
            if let Some(concept) = graph.concepts.get_mut(id) {
                concept.retained = Some(true);
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn mark_descendants_of_marked(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let roots: Vec<String> = graph
            .concepts
            .iter()
            .filter(|(_, c)| c.retained == Some(true))
            .map(|(id, _)| id.clone())
            .collect();

        let closure = reachable(&graph.subtype_adjacency(), roots, None);

        let mut newly_marked = 0u64;
        for id in closure {
            if let Some(concept) = graph.concepts.get_mut(&id) {
                if concept.retained.is_none() {
                    concept.retained = Some(true);
                    newly_marked += 1;
                }
            }
        }
        Ok(newly_marked)
    }

    async fn count_unmarked_concepts(&self) -> Result<u64, StoreError> {
        let graph = self.graph.read();
        Ok(graph
            .concepts
            .values()
            .filter(|c| c.retained.is_none())
            .count() as u64)
    }

    async fn delete_relationships_touching_unmarked(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();

        let doomed: Vec<String> = graph
            .relationships
            .iter()
            .filter(|(_, e)| !graph.retained(&e.source_id) || !graph.retained(&e.destination_id))
            .map(|(id, _)| id.clone())
            .collect();
        let mut deleted = doomed.len() as u64;
        for id in &doomed {
            graph.relationships.remove(id);
        }

        let doomed_hierarchy: Vec<(String, String)> = graph
            .hierarchy
            .iter()
            .filter(|(sub, sup)| !graph.retained(sub) || !graph.retained(sup))
            .cloned()
            .collect();
        deleted += doomed_hierarchy.len() as u64;
        for edge in &doomed_hierarchy {
            graph.hierarchy.remove(edge);
        }

        Ok(deleted)
    }

    async fn delete_descriptions_of_unmarked(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let doomed: Vec<String> = graph
            .owned_by
            .iter()
            .filter(|(_, concept_id)| !graph.retained(concept_id))
            .map(|(description_id, _)| description_id.clone())
            .collect();
        for id in &doomed {
            graph.descriptions.remove(id);
            graph.owned_by.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn delete_unmarked_concepts(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let before = graph.concepts.len();
        graph.concepts.retain(|_, c| c.retained == Some(true));
        Ok((before - graph.concepts.len()) as u64)
    }

    async fn delete_orphan_descriptions(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let doomed: Vec<String> = graph
            .descriptions
            .keys()
            .filter(|id| !graph.owned_by.contains_key(*id))
            .cloned()
            .collect();
        for id in &doomed {
            graph.descriptions.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn clear_marks(&self) -> Result<u64, StoreError> {
        let mut graph = self.graph.write();
        let mut cleared = 0u64;
        for concept in graph.concepts.values_mut() {
            if concept.retained.take().is_some() {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn concept(&self, id: &str) -> Result<Option<ConceptSummary>, StoreError> {
        let graph = self.graph.read();
        let Some(concept) = graph.visible_concept(id) else {
            return Ok(None);
        };

        let mut fsn_terms: Vec<&str> = graph
            .owned_by
            .iter()
            .filter(|(_, owner)| owner.as_str() == id)
            .filter_map(|(desc_id, _)| graph.descriptions.get(desc_id))
            .filter(|d| d.deleted.is_visible() && d.active && d.type_id == FSN_TYPE_ID)
            .map(|d| d.term.as_str())
            .collect();
        fsn_terms.sort();

        Ok(Some(ConceptSummary {
            id: id.to_string(),
            active: concept.active,
            fsn: fsn_terms.first().map(|t| t.to_string()),
        }))
    }

    async fn preferred_term(
        &self,
        id: &str,
        language_code: &str,
    ) -> Result<Option<String>, StoreError> {
        let graph = self.graph.read();
        if graph.visible_concept(id).is_none() {
            return Ok(None);
        }

        let mut terms: Vec<&str> = graph
            .owned_by
            .iter()
            .filter(|(_, owner)| owner.as_str() == id)
            .filter_map(|(desc_id, _)| graph.descriptions.get(desc_id))
            .filter(|d| {
                d.deleted.is_visible()
                    && d.active
                    && d.type_id == PREFERRED_TERM_TYPE_ID
                    && d.language_code == language_code
            })
            .map(|d| d.term.as_str())
            .collect();
        terms.sort();

        Ok(terms.first().map(|t| t.to_string()))
    }

    async fn parents(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let graph = self.graph.read();
        if graph.visible_concept(id).is_none() {
            return Ok(Vec::new());
        }
        let mut out: Vec<String> = graph
            .hierarchy
            .iter()
            .filter(|(sub, _)| sub.as_str() == id)
            .filter(|(_, sup)| graph.visible_concept(sup).is_some_and(|c| c.active))
            .map(|(_, sup)| sup.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    async fn children(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let graph = self.graph.read();
        if graph.visible_concept(id).is_none() {
            return Ok(Vec::new());
        }
        let mut out: Vec<String> = graph
            .hierarchy
            .iter()
            .filter(|(_, sup)| sup.as_str() == id)
            .filter(|(sub, _)| graph.visible_concept(sub).is_some_and(|c| c.active))
            .map(|(sub, _)| sub.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    async fn ancestors(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let graph = self.graph.read();
        if graph.visible_concept(id).is_none() {
            return Ok(Vec::new());
        }
        let mut closure = reachable(&graph.supertype_adjacency(), [id.to_string()], None);
        closure.remove(id);
        let mut out: Vec<String> = closure
            .into_iter()
            .filter(|c| graph.visible_concept(c).is_some_and(|n| n.active))
            .collect();
        out.sort();
        Ok(out)
    }

    async fn descendants(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let graph = self.graph.read();
        if graph.visible_concept(id).is_none() {
            return Ok(Vec::new());
        }
        let mut closure = reachable(&graph.subtype_adjacency(), [id.to_string()], None);
        closure.remove(id);
        let mut out: Vec<String> = closure
            .into_iter()
            .filter(|c| graph.visible_concept(c).is_some_and(|n| n.active))
            .collect();
        out.sort();
        Ok(out)
    }

    async fn is_subtype_of(&self, source_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let graph = self.graph.read();
        if graph.visible_concept(source_id).is_none() || graph.visible_concept(target_id).is_none()
        {
            return Ok(false);
        }
        let mut closure = reachable(
            &graph.supertype_adjacency(),
            [source_id.to_string()],
            None,
        );
        closure.remove(source_id);
        Ok(closure.contains(target_id))
    }

    async fn find_concepts(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConceptMatch>, StoreError> {
        let graph = self.graph.read();
        let mut hits: BTreeSet<(String, String)> = BTreeSet::new();
        for (desc_id, concept_id) in &graph.owned_by {
            let Some(description) = graph.descriptions.get(desc_id) else {
                continue;
            };
            if !description.deleted.is_visible()
                || !description.active
                || !description.term.contains(term)
            {
                continue;
            }
            if !graph.visible_concept(concept_id).is_some_and(|c| c.active) {
                continue;
            }
            hits.insert((concept_id.clone(), description.term.clone()));
        }
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(id, term)| ConceptMatch { id, term })
            .collect())
    }

    async fn relationships_of(
        &self,
        id: &str,
        type_id: Option<&str>,
    ) -> Result<Vec<RelationshipInfo>, StoreError> {
        let graph = self.graph.read();
        if !graph.visible_concept(id).is_some_and(|c| c.active) {
            return Ok(Vec::new());
        }
        let mut out: Vec<RelationshipInfo> = graph
            .relationships
            .values()
            .filter(|e| e.source_id == id && e.deleted.is_visible())
            .filter(|e| type_id.map_or(true, |t| e.type_id == t))
            .filter(|e| {
                graph
                    .visible_concept(&e.destination_id)
                    .is_some_and(|c| c.active)
            })
            .map(|e| RelationshipInfo {
                type_id: e.type_id.clone(),
                target_id: e.destination_id.clone(),
            })
            .collect();
        out.sort_by(|a, b| (&a.type_id, &a.target_id).cmp(&(&b.type_id, &b.target_id)));
        Ok(out)
    }
}
