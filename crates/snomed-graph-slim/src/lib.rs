//! Slim reducer: cut a loaded graph down to the parts a deployment needs.
//!
//! Two independent filters, applied in a fixed order:
//!
//! 1. Relationship-type filter: delete every generic relationship whose
//!    type is not on the allow-list.
//! 2. Hierarchy filter: retain only the chosen root concepts and their
//!    transitive subtypes, then delete everything else in staged passes.
//!
//! The hierarchy filter is a mark-and-sweep over live data. There is no
//! rollback: a failure mid-run leaves the graph partially reduced, and the
//! fix is to reload. Every stage reports an exact row count, and the final
//! stage clears all retained marks so no transient state survives a
//! successful run.

use snomed_graph_store::{GraphStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SlimError {
    /// Neither filter was requested; refusing to run as a no-op guards
    /// against an operator invocation that silently does nothing.
    #[error("no reduction requested: pass a relationship allow-list, hierarchy roots, or both")]
    NothingRequested,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stages of the hierarchy filter, in execution order. No stage is ever
/// skipped; a stage that finds nothing to do reports a zero count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlimStage {
    MarkingRoots,
    MarkingDescendants,
    Counting,
    DeletingRelationships,
    DeletingDescriptions,
    DeletingConcepts,
    DeletingOrphanDescriptions,
    ClearingMarks,
}

impl SlimStage {
    pub fn name(self) -> &'static str {
        match self {
            SlimStage::MarkingRoots => "marking roots",
            SlimStage::MarkingDescendants => "marking descendants",
            SlimStage::Counting => "counting unretained concepts",
            SlimStage::DeletingRelationships => "deleting relationships",
            SlimStage::DeletingDescriptions => "deleting descriptions",
            SlimStage::DeletingConcepts => "deleting concepts",
            SlimStage::DeletingOrphanDescriptions => "deleting orphaned descriptions",
            SlimStage::ClearingMarks => "clearing marks",
        }
    }
}

/// Observer for reduction progress; one callback per completed stage.
pub trait SlimObserver: Send + Sync {
    fn type_filter_applied(&self, deleted: u64) {
        let _ = deleted;
    }

    fn stage_finished(&self, stage: SlimStage, count: u64) {
        let _ = (stage, count);
    }
}

/// Silent observer for library and test callers.
pub struct NoObserver;

impl SlimObserver for NoObserver {}

/// What to keep. `relationship_types` is an allow-list of type ids;
/// `hierarchy_roots` is a set of concept ids whose transitive subtypes are
/// retained. `None` skips that filter entirely.
#[derive(Debug, Clone, Default)]
pub struct SlimOptions {
    pub relationship_types: Option<Vec<String>>,
    pub hierarchy_roots: Option<Vec<String>>,
}

/// Per-stage exact counts from one hierarchy filter run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyReport {
    pub roots_marked: u64,
    pub descendants_marked: u64,
    pub unretained_concepts: u64,
    pub relationships_deleted: u64,
    pub descriptions_deleted: u64,
    pub concepts_deleted: u64,
    pub orphan_descriptions_deleted: u64,
    pub marks_cleared: u64,
}

/// What one reduction run did. A filter that was not requested reports
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlimReport {
    pub relationships_removed_by_type: Option<u64>,
    pub hierarchy: Option<HierarchyReport>,
}

/// Run the requested reduction. At least one filter must be requested.
pub async fn run_slim<S>(
    store: &S,
    options: &SlimOptions,
    observer: &dyn SlimObserver,
) -> Result<SlimReport, SlimError>
where
    S: GraphStore + ?Sized,
{
    if options.relationship_types.is_none() && options.hierarchy_roots.is_none() {
        return Err(SlimError::NothingRequested);
    }

    let mut report = SlimReport::default();

    if let Some(allowed) = &options.relationship_types {
        let deleted = store.delete_relationships_not_in(allowed).await?;
        tracing::info!(deleted, "relationship-type filter applied");
        observer.type_filter_applied(deleted);
        report.relationships_removed_by_type = Some(deleted);
    }

    if let Some(roots) = &options.hierarchy_roots {
        report.hierarchy = Some(filter_hierarchy(store, roots, observer).await?);
    }

    Ok(report)
}

async fn filter_hierarchy<S>(
    store: &S,
    roots: &[String],
    observer: &dyn SlimObserver,
) -> Result<HierarchyReport, SlimError>
where
    S: GraphStore + ?Sized,
{
    let mut report = HierarchyReport::default();

    report.roots_marked = store.mark_concepts(roots).await?;
    observer.stage_finished(SlimStage::MarkingRoots, report.roots_marked);

    report.descendants_marked = store.mark_descendants_of_marked().await?;
    observer.stage_finished(SlimStage::MarkingDescendants, report.descendants_marked);

    report.unretained_concepts = store.count_unmarked_concepts().await?;
    observer.stage_finished(SlimStage::Counting, report.unretained_concepts);
    tracing::info!(
        retained = report.roots_marked + report.descendants_marked,
        unretained = report.unretained_concepts,
        "closure marked"
    );

    report.relationships_deleted = store.delete_relationships_touching_unmarked().await?;
    observer.stage_finished(
        SlimStage::DeletingRelationships,
        report.relationships_deleted,
    );

    report.descriptions_deleted = store.delete_descriptions_of_unmarked().await?;
    observer.stage_finished(SlimStage::DeletingDescriptions, report.descriptions_deleted);

    report.concepts_deleted = store.delete_unmarked_concepts().await?;
    observer.stage_finished(SlimStage::DeletingConcepts, report.concepts_deleted);

    report.orphan_descriptions_deleted = store.delete_orphan_descriptions().await?;
    observer.stage_finished(
        SlimStage::DeletingOrphanDescriptions,
        report.orphan_descriptions_deleted,
    );

    report.marks_cleared = store.clear_marks().await?;
    observer.stage_finished(SlimStage::ClearingMarks, report.marks_cleared);

    tracing::info!(
        concepts = report.concepts_deleted,
        descriptions = report.descriptions_deleted,
        relationships = report.relationships_deleted,
        "hierarchy filter complete"
    );
    Ok(report)
}
