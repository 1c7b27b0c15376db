use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::domain::{GeneName, GeneToIdMap, SpeciesCode};
use crate::flatfile::first_species_id;
use crate::kegg::KeggClient;
use crate::pacing::PacedPool;

const FIND_DATABASE: &str = "genes";

/// Maps gene names to species-scoped KEGG identifiers, one `find`
/// request per gene.
pub struct IdentifierResolver<C: KeggClient> {
    client: C,
    pool: PacedPool,
}

impl<C: KeggClient> IdentifierResolver<C> {
    /// Accepts a [`Pacing`](crate::pacing::Pacing) or an existing pool
    /// whose pacers are shared with other stages.
    pub fn new(client: C, pool: impl Into<PacedPool>) -> Self {
        Self {
            client,
            pool: pool.into(),
        }
    }

    /// Genes that fail to resolve, for whatever reason, are absent from
    /// the result. This never fails as a whole.
    pub fn resolve(&self, genes: &[GeneName], species: &SpeciesCode) -> GeneToIdMap {
        let mut seen = HashSet::new();
        let distinct = genes
            .iter()
            .filter(|gene| seen.insert(*gene))
            .collect::<Vec<_>>();

        let hits = self.pool.run(&distinct, |gene| {
            let body = match self.client.find(FIND_DATABASE, gene.as_str()) {
                Ok(body) => body,
                Err(err) => {
                    warn!(gene = %gene, error = %err, "skipping gene after failed lookup");
                    return None;
                }
            };
            let id = first_species_id(&body, species);
            match &id {
                Some(id) => debug!(gene = %gene, id = %id, "resolved gene"),
                None => debug!(gene = %gene, species = %species, "no match for species"),
            }
            id.map(|id| ((*gene).clone(), id))
        });

        let resolved = hits.into_iter().flatten().collect::<GeneToIdMap>();
        info!(
            requested = distinct.len(),
            resolved = resolved.len(),
            "resolved KEGG identifiers"
        );
        resolved
    }
}
