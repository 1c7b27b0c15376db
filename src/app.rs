use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    ExternalId, GeneName, GeneToIdMap, IdToPathwaysMap, PathwayId, SpeciesCode,
};
use crate::error::KeggError;
use crate::graph::{PathwayGraph, fetch_pathway_data};
use crate::kegg::KeggClient;
use crate::materialize::{ArtifactMaterializer, MaterializedArtifact};
use crate::pacing::{PacedPool, Pacing};
use crate::pathways::PathwayLookup;
use crate::resolver::IdentifierResolver;

#[derive(Debug, Clone)]
pub struct MapRequest {
    pub genes: Vec<GeneName>,
    pub species: SpeciesCode,
    pub output_dir: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub species: SpeciesCode,
    pub genes: Vec<GeneName>,
    pub gene_to_id: BTreeMap<GeneName, ExternalId>,
    pub unresolved: Vec<GeneName>,
    pub id_to_pathways: IdToPathwaysMap,
    pub artifacts: Vec<MaterializedArtifact>,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}

/// One pathway map to save and the identifiers it was chosen for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub pathway: PathwayId,
    pub highlight: Vec<ExternalId>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Every KEGG request made through an `App` waits on the same pacers,
/// whichever stage issues it.
pub struct App<C: KeggClient> {
    client: C,
    pool: PacedPool,
}

impl<C: KeggClient> App<C> {
    pub fn new(client: C, pacing: Pacing) -> Self {
        Self {
            client,
            pool: PacedPool::new(pacing),
        }
    }

    pub fn resolve(&self, genes: &[GeneName], species: &SpeciesCode) -> GeneToIdMap {
        IdentifierResolver::new(&self.client, self.pool.clone()).resolve(genes, species)
    }

    pub fn lookup(&self, ids: &[ExternalId]) -> IdToPathwaysMap {
        PathwayLookup::new(&self.client, self.pool.clone()).lookup(ids)
    }

    pub fn render(
        &self,
        pathway: &PathwayId,
        highlight: &[ExternalId],
        output_dir: &Utf8Path,
    ) -> Result<MaterializedArtifact, KeggError> {
        self.pool.paced(|| {
            ArtifactMaterializer::new(&self.client).materialize(pathway, highlight, output_dir)
        })
    }

    pub fn graph(&self, pathway: &PathwayId) -> Result<PathwayGraph, KeggError> {
        let record = self.pool.paced(|| fetch_pathway_data(&self.client, pathway))?;
        Ok(PathwayGraph::from_record(&record))
    }

    /// Gene names to saved pathway maps: resolve, look up pathways, then
    /// save the first pathway of every identifier that has one.
    pub fn map_genes(
        &self,
        request: MapRequest,
        sink: &dyn ProgressSink,
    ) -> Result<MapReport, KeggError> {
        if request.genes.is_empty() {
            return Err(KeggError::NoGenes);
        }

        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} gene(s) in {}",
                request.genes.len(),
                request.species
            ),
            elapsed: None,
        });
        let gene_to_id = self.resolve(&request.genes, &request.species);
        if gene_to_id.is_empty() {
            return Err(KeggError::NoIdentifiers);
        }

        let mut ids = gene_to_id.values().cloned().collect::<Vec<_>>();
        ids.sort();
        sink.event(ProgressEvent {
            message: format!("phase=Lookup; {} identifier(s)", ids.len()),
            elapsed: Some(started.elapsed()),
        });
        let id_to_pathways = self.lookup(&ids);

        let jobs = plan_renders(&id_to_pathways);
        sink.event(ProgressEvent {
            message: format!("phase=Materialize; {} pathway map(s)", jobs.len()),
            elapsed: Some(started.elapsed()),
        });
        let materializer = ArtifactMaterializer::new(&self.client);
        let artifacts = self.pool.run(&jobs, |job| {
            materializer.materialize(&job.pathway, &job.highlight, &request.output_dir)
        })
        .into_iter()
        .collect::<Result<Vec<_>, KeggError>>()?;

        let mut seen = HashSet::new();
        let unresolved = request
            .genes
            .iter()
            .filter(|gene| !gene_to_id.contains_key(*gene) && seen.insert(*gene))
            .cloned()
            .collect();
        let names = request
            .genes
            .iter()
            .map(GeneName::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(started.elapsed()),
        });
        Ok(MapReport {
            species: request.species,
            genes: request.genes,
            gene_to_id: gene_to_id.into_iter().collect(),
            unresolved,
            id_to_pathways,
            artifacts,
            message: format!(
                "Pathway maps generated successfully for the following genes: {names}"
            ),
            generated_at: Utc::now(),
        })
    }
}

/// The representative pathway of an identifier is the first one in its
/// record. Identifiers sharing it are merged so every pathway file has a
/// single writer.
pub fn plan_renders(id_to_pathways: &IdToPathwaysMap) -> Vec<RenderJob> {
    let mut jobs: Vec<RenderJob> = Vec::new();
    for (id, pathways) in id_to_pathways {
        let Some(first) = pathways.first() else {
            continue;
        };
        match jobs.iter_mut().find(|job| &job.pathway == first) {
            Some(job) => job.highlight.push(id.clone()),
            None => jobs.push(RenderJob {
                pathway: first.clone(),
                highlight: vec![id.clone()],
            }),
        }
    }
    jobs
}
