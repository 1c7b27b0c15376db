use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::domain::{ExternalId, IdToPathwaysMap};
use crate::flatfile::pathway_ids;
use crate::kegg::KeggClient;
use crate::pacing::PacedPool;

/// Reads the full KEGG record of each identifier and collects its
/// `PATHWAY` entries.
pub struct PathwayLookup<C: KeggClient> {
    client: C,
    pool: PacedPool,
}

impl<C: KeggClient> PathwayLookup<C> {
    pub fn new(client: C, pool: impl Into<PacedPool>) -> Self {
        Self {
            client,
            pool: pool.into(),
        }
    }

    /// Every input id gets an entry. Ids whose record could not be read
    /// map to an empty list, unlike the resolver which drops misses.
    pub fn lookup(&self, ids: &[ExternalId]) -> IdToPathwaysMap {
        let mut seen = HashSet::new();
        let distinct = ids
            .iter()
            .filter(|id| seen.insert(*id))
            .collect::<Vec<_>>();

        let pathways = self.pool.run(&distinct, |id| {
            match self.client.get(id.as_str()) {
                Ok(body) => {
                    let found = pathway_ids(&body);
                    debug!(id = %id, pathways = found.len(), "read KEGG record");
                    found
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "record unavailable, no pathways recorded");
                    Vec::new()
                }
            }
        });

        let map = distinct
            .into_iter()
            .cloned()
            .zip(pathways)
            .collect::<IdToPathwaysMap>();
        info!(
            ids = map.len(),
            with_pathways = map.values().filter(|p| !p.is_empty()).count(),
            "looked up pathways"
        );
        map
    }
}
