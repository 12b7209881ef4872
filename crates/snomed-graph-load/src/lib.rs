//! Three-pass bulk loader: RF2 release files into a [`GraphStore`].
//!
//! Ordering is the whole design. Concepts load first, then descriptions,
//! then relationships, so every edge created in a later pass resolves
//! against nodes created in an earlier one. After the relationship pass the
//! hierarchy edge is materialized from the active is-a rows. Each pass
//! streams its file and flushes fixed-size batches; a batch either lands
//! whole or fails the load.
//!
//! Inactive rows are handled differently per pass: inactive concepts and
//! descriptions are loaded with `active = false` (the read plane filters
//! them), while inactive relationships are skipped outright and counted in
//! the report.

use std::time::{Duration, Instant};

use snomed_graph_rf2::{count_data_rows, ReleaseFiles, Rf2Error};
use snomed_graph_store::{
    GraphStore, NewConcept, NewDescription, NewRelationship, StoreError,
};

/// Default rows per bulk write.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Rf2(#[from] Rf2Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The loader's passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPass {
    Concepts,
    Descriptions,
    Relationships,
}

impl LoadPass {
    pub fn name(self) -> &'static str {
        match self {
            LoadPass::Concepts => "concepts",
            LoadPass::Descriptions => "descriptions",
            LoadPass::Relationships => "relationships",
        }
    }
}

/// Observer for load progress. `total_rows` comes from a cheap pre-scan of
/// the file and is only used for display; the loader never trusts it.
pub trait Progress: Send + Sync {
    fn pass_started(&self, pass: LoadPass, total_rows: u64) {
        let _ = (pass, total_rows);
    }

    /// Called after each batch flush with the cumulative count for the pass.
    fn rows_loaded(&self, pass: LoadPass, loaded: u64) {
        let _ = (pass, loaded);
    }

    fn pass_finished(&self, pass: LoadPass, loaded: u64) {
        let _ = (pass, loaded);
    }
}

/// Silent observer for library and test callers.
pub struct NoProgress;

impl Progress for NoProgress {}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub batch_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// What one full load did, with exact counts from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub concepts: u64,
    pub descriptions: u64,
    pub relationships: u64,
    pub inactive_relationships_skipped: u64,
    pub hierarchy_edges: u64,
    pub elapsed: Duration,
}

/// Run the full load: schema, three passes in order, hierarchy
/// materialization. Fails fast on the first malformed row or rejected
/// batch; rows already flushed stay in the store.
pub async fn load_release<S>(
    store: &S,
    files: &ReleaseFiles,
    config: &LoadConfig,
    progress: &dyn Progress,
) -> Result<LoadReport, LoadError>
where
    S: GraphStore + ?Sized,
{
    let started = Instant::now();
    store.ensure_schema().await?;

    let mut report = LoadReport::default();
    report.concepts = load_concepts(store, files, config, progress).await?;
    report.descriptions = load_descriptions(store, files, config, progress).await?;
    let (loaded, skipped) = load_relationships(store, files, config, progress).await?;
    report.relationships = loaded;
    report.inactive_relationships_skipped = skipped;

    report.hierarchy_edges = store.materialize_hierarchy().await?;
    tracing::info!(edges = report.hierarchy_edges, "hierarchy materialized");

    report.elapsed = started.elapsed();
    Ok(report)
}

async fn load_concepts<S>(
    store: &S,
    files: &ReleaseFiles,
    config: &LoadConfig,
    progress: &dyn Progress,
) -> Result<u64, LoadError>
where
    S: GraphStore + ?Sized,
{
    progress.pass_started(LoadPass::Concepts, count_data_rows(&files.concepts)?);

    let mut loaded = 0u64;
    let mut batch: Vec<NewConcept> = Vec::with_capacity(config.batch_size);
    for row in files.concept_rows()? {
        let row = row?;
        batch.push(NewConcept {
            id: row.id,
            active: row.active,
            module_id: row.module_id,
            definition_status_id: row.definition_status_id,
        });
        if batch.len() == config.batch_size {
            loaded += store.create_concepts(&batch).await?;
            batch.clear();
            progress.rows_loaded(LoadPass::Concepts, loaded);
        }
    }
    if !batch.is_empty() {
        loaded += store.create_concepts(&batch).await?;
        progress.rows_loaded(LoadPass::Concepts, loaded);
    }

    progress.pass_finished(LoadPass::Concepts, loaded);
    tracing::info!(loaded, "concept pass complete");
    Ok(loaded)
}

async fn load_descriptions<S>(
    store: &S,
    files: &ReleaseFiles,
    config: &LoadConfig,
    progress: &dyn Progress,
) -> Result<u64, LoadError>
where
    S: GraphStore + ?Sized,
{
    progress.pass_started(LoadPass::Descriptions, count_data_rows(&files.descriptions)?);

    let mut loaded = 0u64;
    let mut batch: Vec<NewDescription> = Vec::with_capacity(config.batch_size);
    for row in files.description_rows()? {
        let row = row?;
        batch.push(NewDescription {
            id: row.id,
            concept_id: row.concept_id,
            active: row.active,
            term: row.term,
            type_id: row.type_id,
            language_code: row.language_code,
        });
        if batch.len() == config.batch_size {
            loaded += store.create_descriptions(&batch).await?;
            batch.clear();
            progress.rows_loaded(LoadPass::Descriptions, loaded);
        }
    }
    if !batch.is_empty() {
        loaded += store.create_descriptions(&batch).await?;
        progress.rows_loaded(LoadPass::Descriptions, loaded);
    }

    progress.pass_finished(LoadPass::Descriptions, loaded);
    tracing::info!(loaded, "description pass complete");
    Ok(loaded)
}

async fn load_relationships<S>(
    store: &S,
    files: &ReleaseFiles,
    config: &LoadConfig,
    progress: &dyn Progress,
) -> Result<(u64, u64), LoadError>
where
    S: GraphStore + ?Sized,
{
    progress.pass_started(
        LoadPass::Relationships,
        count_data_rows(&files.relationships)?,
    );

    let mut loaded = 0u64;
    let mut skipped = 0u64;
    let mut batch: Vec<NewRelationship> = Vec::with_capacity(config.batch_size);
    for row in files.relationship_rows()? {
        let row = row?;
        if !row.active {
            skipped += 1;
            continue;
        }
        batch.push(NewRelationship {
            id: row.id,
            source_id: row.source_id,
            destination_id: row.destination_id,
            type_id: row.type_id,
            characteristic_type_id: row.characteristic_type_id,
            modifier_id: row.modifier_id,
            active: row.active,
        });
        if batch.len() == config.batch_size {
            loaded += store.create_relationships(&batch).await?;
            batch.clear();
            progress.rows_loaded(LoadPass::Relationships, loaded);
        }
    }
    if !batch.is_empty() {
        loaded += store.create_relationships(&batch).await?;
        progress.rows_loaded(LoadPass::Relationships, loaded);
    }

    progress.pass_finished(LoadPass::Relationships, loaded);
    tracing::info!(loaded, skipped, "relationship pass complete");
    Ok((loaded, skipped))
}
