use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::domain::PathwayId;
use crate::error::KeggError;
use crate::flatfile::{Edge, graph_elements};
use crate::kegg::KeggClient;
use crate::materialize::write_atomic;

/// Raw KEGG record of a pathway.
pub fn fetch_pathway_data<C: KeggClient>(
    client: &C,
    pathway: &PathwayId,
) -> Result<String, KeggError> {
    client
        .get(pathway.as_str())
        .map_err(|err| KeggError::PathwayData(err.detail()))
}

/// Genes and compounds of a pathway record plus its links to related
/// pathways.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathwayGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

impl PathwayGraph {
    pub fn from_record(body: &str) -> Self {
        let (nodes, edges) = graph_elements(body);
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Graphviz rendering. Edge endpoints missing from `nodes` are
    /// declared too so the output stands on its own.
    pub fn to_dot(&self, name: &str) -> String {
        let mut declared = BTreeSet::new();
        let mut dot = String::new();
        let _ = writeln!(dot, "graph {} {{", quote(name));
        let _ = writeln!(dot, "    node [shape=box, style=rounded];");
        let endpoints = self.edges.iter().flat_map(|(a, b)| [a, b]);
        for node in self.nodes.iter().chain(endpoints) {
            if declared.insert(node.as_str()) {
                let _ = writeln!(dot, "    {};", quote(node));
            }
        }
        for (from, to) in &self.edges {
            let _ = writeln!(dot, "    {} -- {};", quote(from), quote(to));
        }
        dot.push_str("}\n");
        dot
    }

    pub fn write_dot(&self, path: &Utf8Path, name: &str) -> Result<(), KeggError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        }
        write_atomic(path, self.to_dot(name).as_bytes())?;
        info!(
            path = %path,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "wrote pathway graph"
        );
        Ok(())
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
