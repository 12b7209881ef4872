//! Neo4j backend over the Bolt protocol.
//!
//! One fixed parameterized Cypher statement per typed operation; no query
//! text is ever assembled from caller input. Bulk writes go through
//! `UNWIND $batch` with one parameter map per row; dependent creates
//! (descriptions, relationships) verify that every referenced concept id
//! resolves *before* the create statement runs, so a referential failure
//! rejects the whole batch with nothing written. That check-then-create
//! sequence relies on this core's exclusive write access to the store,
//! which the reducer's mark/cascade invariants already assume.
//!
//! Counts returned by the reduction plane are exact per-row counts
//! (`RETURN count(...)` on each delete/update), not the approximate
//! batch-extension arithmetic some operators may know from APOC.

use std::collections::BTreeSet;

use async_trait::async_trait;
use neo4rs::{query, BoltMap, BoltType, Graph, Query};

use crate::constants::{FSN_TYPE_ID, IS_A_TYPE_ID, PREFERRED_TERM_TYPE_ID};
use crate::{
    ConceptMatch, ConceptSummary, GraphStore, NewConcept, NewDescription, NewRelationship,
    RelationshipInfo, StoreError,
};

/// Connection parameters, resolved once at startup and threaded explicitly.
#[derive(Debug, Clone)]
pub struct BoltConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

/// Neo4j-backed [`GraphStore`].
pub struct BoltStore {
    graph: Graph,
}

// ---------------------------------------------------------------------------
// Statement table (fixed, closed set)
// ---------------------------------------------------------------------------

const SCHEMA_STATEMENTS: [&str; 6] = [
    "CREATE CONSTRAINT concept_id IF NOT EXISTS FOR (c:Concept) REQUIRE c.id IS UNIQUE",
    "CREATE CONSTRAINT description_id IF NOT EXISTS FOR (d:Description) REQUIRE d.id IS UNIQUE",
    "CREATE CONSTRAINT relationship_id IF NOT EXISTS FOR ()-[r:RELATIONSHIP]->() REQUIRE r.id IS UNIQUE",
    "CREATE INDEX concept_active IF NOT EXISTS FOR (c:Concept) ON (c.active)",
    "CREATE INDEX description_term IF NOT EXISTS FOR (d:Description) ON (d.term)",
    "CREATE INDEX relationship_type IF NOT EXISTS FOR ()-[r:RELATIONSHIP]->() ON (r.typeId)",
];

const CREATE_CONCEPTS: &str = "\
UNWIND $batch AS row \
CREATE (c:Concept {id: row.id, active: row.active, moduleId: row.moduleId, \
definitionStatusId: row.definitionStatusId}) \
RETURN count(c) AS n";

const MISSING_CONCEPT_IDS: &str = "\
UNWIND $ids AS id \
OPTIONAL MATCH (c:Concept {id: id}) \
WITH id, c WHERE c IS NULL \
RETURN id";

const CREATE_DESCRIPTIONS: &str = "\
UNWIND $batch AS row \
MATCH (c:Concept {id: row.conceptId}) \
CREATE (d:Description {id: row.id, active: row.active, term: row.term, \
typeId: row.typeId, languageCode: row.languageCode}) \
CREATE (c)-[:HAS_DESCRIPTION]->(d) \
RETURN count(d) AS n";

const CREATE_RELATIONSHIPS: &str = "\
UNWIND $batch AS row \
MATCH (source:Concept {id: row.sourceId}) \
MATCH (destination:Concept {id: row.destinationId}) \
CREATE (source)-[r:RELATIONSHIP {id: row.id, active: row.active, typeId: row.typeId, \
characteristicTypeId: row.characteristicTypeId, modifierId: row.modifierId}]->(destination) \
RETURN count(r) AS n";

const COUNT_HIERARCHY_EDGES: &str = "MATCH ()-[r:IS_A]->() RETURN count(r) AS n";

// MERGE, not CREATE: re-running materialization must not duplicate edges.
const MATERIALIZE_HIERARCHY: &str = "\
MATCH (source:Concept)-[r:RELATIONSHIP]->(destination:Concept) \
WHERE r.typeId = $isaType AND r.active = true \
MERGE (source)-[:IS_A]->(destination) \
RETURN count(*) AS n";

const DELETE_RELATIONSHIPS_NOT_IN: &str = "\
MATCH ()-[r:RELATIONSHIP]->() \
WHERE NOT r.typeId IN $types \
DELETE r \
RETURN count(r) AS n";

const MARK_CONCEPTS: &str = "\
MATCH (c:Concept) WHERE c.id IN $ids \
SET c.keep = true \
RETURN count(c) AS n";

const MARK_DESCENDANTS: &str = "\
MATCH (root:Concept) WHERE root.keep = true \
MATCH (root)<-[:IS_A*]-(descendant:Concept) \
WHERE descendant.keep IS NULL \
SET descendant.keep = true \
RETURN count(DISTINCT descendant) AS n";

const COUNT_UNMARKED: &str = "\
MATCH (c:Concept) WHERE c.keep IS NULL \
RETURN count(c) AS n";

const DELETE_RELATIONSHIPS_TOUCHING_UNMARKED: &str = "\
MATCH (c:Concept)-[r:RELATIONSHIP|IS_A]-() \
WHERE c.keep IS NULL \
DELETE r \
RETURN count(DISTINCT r) AS n";

const DELETE_DESCRIPTIONS_OF_UNMARKED: &str = "\
MATCH (c:Concept)-[:HAS_DESCRIPTION]->(d:Description) \
WHERE c.keep IS NULL \
DETACH DELETE d \
RETURN count(DISTINCT d) AS n";

const DELETE_UNMARKED_CONCEPTS: &str = "\
MATCH (c:Concept) WHERE c.keep IS NULL \
DETACH DELETE c \
RETURN count(c) AS n";

const DELETE_ORPHAN_DESCRIPTIONS: &str = "\
MATCH (d:Description) \
WHERE NOT ()-[:HAS_DESCRIPTION]->(d) \
DELETE d \
RETURN count(d) AS n";

const CLEAR_MARKS: &str = "\
MATCH (c:Concept) WHERE c.keep IS NOT NULL \
REMOVE c.keep \
RETURN count(c) AS n";

const GET_CONCEPT: &str = "\
MATCH (c:Concept {id: $id}) \
WHERE c.is_deleted IS NULL OR c.is_deleted = false \
OPTIONAL MATCH (c)-[:HAS_DESCRIPTION]->(d:Description) \
WHERE (d.is_deleted IS NULL OR d.is_deleted = false) \
AND d.typeId = $fsnType AND d.active = true \
RETURN c.id AS id, c.active AS active, d.term AS fsn";

const GET_PREFERRED_TERM: &str = "\
MATCH (c:Concept {id: $id})-[:HAS_DESCRIPTION]->(d:Description) \
WHERE (c.is_deleted IS NULL OR c.is_deleted = false) \
AND (d.is_deleted IS NULL OR d.is_deleted = false) \
AND d.typeId = $termType AND d.active = true \
AND d.languageCode = $languageCode \
RETURN d.term AS term";

const GET_PARENTS: &str = "\
MATCH (child:Concept {id: $id})-[:IS_A]->(parent:Concept) \
WHERE (child.is_deleted IS NULL OR child.is_deleted = false) \
AND (parent.is_deleted IS NULL OR parent.is_deleted = false) \
AND parent.active = true \
RETURN parent.id AS id";

const GET_CHILDREN: &str = "\
MATCH (parent:Concept {id: $id})<-[:IS_A]-(child:Concept) \
WHERE (parent.is_deleted IS NULL OR parent.is_deleted = false) \
AND (child.is_deleted IS NULL OR child.is_deleted = false) \
AND child.active = true \
RETURN child.id AS id";

const GET_ANCESTORS: &str = "\
MATCH (child:Concept {id: $id})-[:IS_A*]->(ancestor:Concept) \
WHERE (child.is_deleted IS NULL OR child.is_deleted = false) \
AND (ancestor.is_deleted IS NULL OR ancestor.is_deleted = false) \
AND ancestor.active = true \
RETURN DISTINCT ancestor.id AS id";

const GET_DESCENDANTS: &str = "\
MATCH (ancestor:Concept {id: $id})<-[:IS_A*]-(descendant:Concept) \
WHERE (ancestor.is_deleted IS NULL OR ancestor.is_deleted = false) \
AND (descendant.is_deleted IS NULL OR descendant.is_deleted = false) \
AND descendant.active = true \
RETURN DISTINCT descendant.id AS id";

const IS_SUBTYPE_OF: &str = "\
MATCH (source:Concept {id: $sourceId}) \
MATCH (target:Concept {id: $targetId}) \
WHERE (source.is_deleted IS NULL OR source.is_deleted = false) \
AND (target.is_deleted IS NULL OR target.is_deleted = false) \
OPTIONAL MATCH p = (source)-[:IS_A*]->(target) \
RETURN count(p) > 0 AS isa";

const FIND_CONCEPTS: &str = "\
MATCH (c:Concept)-[:HAS_DESCRIPTION]->(d:Description) \
WHERE (c.is_deleted IS NULL OR c.is_deleted = false) \
AND (d.is_deleted IS NULL OR d.is_deleted = false) \
AND d.term CONTAINS $term AND c.active = true AND d.active = true \
RETURN DISTINCT c.id AS id, d.term AS term \
LIMIT $limit";

const GET_RELATIONSHIPS: &str = "\
MATCH (c:Concept {id: $id})-[r:RELATIONSHIP]->(target:Concept) \
WHERE (c.is_deleted IS NULL OR c.is_deleted = false) \
AND (target.is_deleted IS NULL OR target.is_deleted = false) \
AND (r.is_deleted IS NULL OR r.is_deleted = false) \
AND c.active = true AND target.active = true \
RETURN r.typeId AS typeId, target.id AS targetId";

const GET_RELATIONSHIPS_OF_TYPE: &str = "\
MATCH (c:Concept {id: $id})-[r:RELATIONSHIP]->(target:Concept) \
WHERE (c.is_deleted IS NULL OR c.is_deleted = false) \
AND (target.is_deleted IS NULL OR target.is_deleted = false) \
AND (r.is_deleted IS NULL OR r.is_deleted = false) \
AND c.active = true AND target.active = true \
AND r.typeId = $typeId \
RETURN r.typeId AS typeId, target.id AS targetId";

// ---------------------------------------------------------------------------
// Parameter maps
// ---------------------------------------------------------------------------

fn concept_param(row: &NewConcept) -> BoltType {
    let mut map = BoltMap::new();
    map.put("id".into(), row.id.clone().into());
    map.put("active".into(), row.active.into());
    map.put("moduleId".into(), row.module_id.clone().into());
    map.put(
        "definitionStatusId".into(),
        row.definition_status_id.clone().into(),
    );
    BoltType::Map(map)
}

fn description_param(row: &NewDescription) -> BoltType {
    let mut map = BoltMap::new();
    map.put("id".into(), row.id.clone().into());
    map.put("conceptId".into(), row.concept_id.clone().into());
    map.put("active".into(), row.active.into());
    map.put("term".into(), row.term.clone().into());
    map.put("typeId".into(), row.type_id.clone().into());
    map.put("languageCode".into(), row.language_code.clone().into());
    BoltType::Map(map)
}

fn relationship_param(row: &NewRelationship) -> BoltType {
    let mut map = BoltMap::new();
    map.put("id".into(), row.id.clone().into());
    map.put("sourceId".into(), row.source_id.clone().into());
    map.put("destinationId".into(), row.destination_id.clone().into());
    map.put("typeId".into(), row.type_id.clone().into());
    map.put(
        "characteristicTypeId".into(),
        row.characteristic_type_id.clone().into(),
    );
    map.put("modifierId".into(), row.modifier_id.clone().into());
    map.put("active".into(), row.active.into());
    BoltType::Map(map)
}

impl BoltStore {
    pub async fn connect(config: &BoltConfig) -> Result<Self, StoreError> {
        let graph = Graph::new(
            config.uri.as_str(),
            config.user.as_str(),
            config.password.as_str(),
        )
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { graph })
    }

    /// Run a statement whose single result row carries an integer `n`.
    async fn single_count(&self, q: Query) -> Result<u64, StoreError> {
        let mut rows = self.graph.execute(q).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::ResultShape("expected a count row".into()))?;
        let n: i64 = row
            .get("n")
            .map_err(|e| StoreError::ResultShape(e.to_string()))?;
        Ok(n.max(0) as u64)
    }

    /// Collect the string column `column` from every result row.
    async fn string_column(&self, q: Query, column: &str) -> Result<Vec<String>, StoreError> {
        let mut rows = self.graph.execute(q).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let value: String = row
                .get(column)
                .map_err(|e| StoreError::ResultShape(e.to_string()))?;
            out.push(value);
        }
        out.sort();
        Ok(out)
    }

    /// Reject a dependent batch up front if any referenced concept id does
    /// not resolve in the store.
    async fn check_concepts_exist<'a, I>(&self, ids: I, batch: usize) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = ids.into_iter().collect();
        let params: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        let missing = self
            .string_column(query(MISSING_CONCEPT_IDS).param("ids", params), "id")
            .await?;
        if let Some(first) = missing.first() {
            return Err(StoreError::ReferentialIntegrity {
                missing: missing.len(),
                batch,
                first_missing: first.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for BoltStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA_STATEMENTS {
            self.graph.run(query(statement)).await?;
        }
        tracing::debug!("schema constraints and indexes declared");
        Ok(())
    }

    async fn create_concepts(&self, batch: &[NewConcept]) -> Result<u64, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let rows: Vec<BoltType> = batch.iter().map(concept_param).collect();
        self.single_count(query(CREATE_CONCEPTS).param("batch", rows))
            .await
    }

    async fn create_descriptions(&self, batch: &[NewDescription]) -> Result<u64, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.check_concepts_exist(batch.iter().map(|r| r.concept_id.as_str()), batch.len())
            .await?;
        let rows: Vec<BoltType> = batch.iter().map(description_param).collect();
        self.single_count(query(CREATE_DESCRIPTIONS).param("batch", rows))
            .await
    }

    async fn create_relationships(&self, batch: &[NewRelationship]) -> Result<u64, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let endpoints = batch
            .iter()
            .flat_map(|r| [r.source_id.as_str(), r.destination_id.as_str()]);
        self.check_concepts_exist(endpoints, batch.len()).await?;
        let rows: Vec<BoltType> = batch.iter().map(relationship_param).collect();
        self.single_count(query(CREATE_RELATIONSHIPS).param("batch", rows))
            .await
    }

    async fn materialize_hierarchy(&self) -> Result<u64, StoreError> {
        // MERGE makes re-runs duplicate-free, but its row count is the match
        // count; the created count is the before/after difference.
        let before = self.single_count(query(COUNT_HIERARCHY_EDGES)).await?;
        self.single_count(query(MATERIALIZE_HIERARCHY).param("isaType", IS_A_TYPE_ID))
            .await?;
        let after = self.single_count(query(COUNT_HIERARCHY_EDGES)).await?;
        Ok(after.saturating_sub(before))
    }

    async fn delete_relationships_not_in(
        &self,
        allowed_type_ids: &[String],
    ) -> Result<u64, StoreError> {
        self.single_count(
            query(DELETE_RELATIONSHIPS_NOT_IN).param("types", allowed_type_ids.to_vec()),
        )
        .await
    }

    async fn mark_concepts(&self, ids: &[String]) -> Result<u64, StoreError> {
        self.single_count(query(MARK_CONCEPTS).param("ids", ids.to_vec()))
            .await
    }

    async fn mark_descendants_of_marked(&self) -> Result<u64, StoreError> {
        self.single_count(query(MARK_DESCENDANTS)).await
    }

    async fn count_unmarked_concepts(&self) -> Result<u64, StoreError> {
        self.single_count(query(COUNT_UNMARKED)).await
    }

    async fn delete_relationships_touching_unmarked(&self) -> Result<u64, StoreError> {
        self.single_count(query(DELETE_RELATIONSHIPS_TOUCHING_UNMARKED))
            .await
    }

    async fn delete_descriptions_of_unmarked(&self) -> Result<u64, StoreError> {
        self.single_count(query(DELETE_DESCRIPTIONS_OF_UNMARKED))
            .await
    }

    async fn delete_unmarked_concepts(&self) -> Result<u64, StoreError> {
        self.single_count(query(DELETE_UNMARKED_CONCEPTS)).await
    }

    async fn delete_orphan_descriptions(&self) -> Result<u64, StoreError> {
        self.single_count(query(DELETE_ORPHAN_DESCRIPTIONS)).await
    }

    async fn clear_marks(&self) -> Result<u64, StoreError> {
        self.single_count(query(CLEAR_MARKS)).await
    }

    async fn concept(&self, id: &str) -> Result<Option<ConceptSummary>, StoreError> {
        let mut rows = self
            .graph
            .execute(query(GET_CONCEPT).param("id", id).param("fsnType", FSN_TYPE_ID))
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let shape = |e: neo4rs::DeError| StoreError::ResultShape(e.to_string());
        Ok(Some(ConceptSummary {
            id: row.get("id").map_err(shape)?,
            active: row.get("active").map_err(shape)?,
            fsn: row.get("fsn").map_err(shape)?,
        }))
    }

    async fn preferred_term(
        &self,
        id: &str,
        language_code: &str,
    ) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .graph
            .execute(
                query(GET_PREFERRED_TERM)
                    .param("id", id)
                    .param("termType", PREFERRED_TERM_TYPE_ID)
                    .param("languageCode", language_code),
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let term: String = row
            .get("term")
            .map_err(|e| StoreError::ResultShape(e.to_string()))?;
        Ok(Some(term))
    }

    async fn parents(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.string_column(query(GET_PARENTS).param("id", id), "id")
            .await
    }

    async fn children(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.string_column(query(GET_CHILDREN).param("id", id), "id")
            .await
    }

    async fn ancestors(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.string_column(query(GET_ANCESTORS).param("id", id), "id")
            .await
    }

    async fn descendants(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.string_column(query(GET_DESCENDANTS).param("id", id), "id")
            .await
    }

    async fn is_subtype_of(&self, source_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let mut rows = self
            .graph
            .execute(
                query(IS_SUBTYPE_OF)
                    .param("sourceId", source_id)
                    .param("targetId", target_id),
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(false);
        };
        row.get("isa")
            .map_err(|e| StoreError::ResultShape(e.to_string()))
    }

    async fn find_concepts(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConceptMatch>, StoreError> {
        let mut rows = self
            .graph
            .execute(
                query(FIND_CONCEPTS)
                    .param("term", term)
                    .param("limit", limit as i64),
            )
            .await?;
        let shape = |e: neo4rs::DeError| StoreError::ResultShape(e.to_string());
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(ConceptMatch {
                id: row.get("id").map_err(shape)?,
                term: row.get("term").map_err(shape)?,
            });
        }
        Ok(out)
    }

    async fn relationships_of(
        &self,
        id: &str,
        type_id: Option<&str>,
    ) -> Result<Vec<RelationshipInfo>, StoreError> {
        let q = match type_id {
            Some(type_id) => query(GET_RELATIONSHIPS_OF_TYPE)
                .param("id", id)
                .param("typeId", type_id),
            None => query(GET_RELATIONSHIPS).param("id", id),
        };
        let mut rows = self.graph.execute(q).await?;
        let shape = |e: neo4rs::DeError| StoreError::ResultShape(e.to_string());
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(RelationshipInfo {
                type_id: row.get("typeId").map_err(shape)?,
                target_id: row.get("targetId").map_err(shape)?,
            });
        }
        Ok(out)
    }
}
