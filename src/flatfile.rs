//! Line-oriented parsing of KEGG flat-text responses.
//!
//! The REST API answers `find` with `id<TAB>description` lines and `get`
//! with a DBGET record: a tag in the first twelve columns, its value after
//! it, and continuation lines indented with spaces.

use serde::Serialize;

use crate::domain::{ExternalId, PathwayId, SpeciesCode};

const RECORD_END: &str = "///";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindHit {
    pub id: String,
    pub description: String,
}

pub fn parse_find_line(line: &str) -> Option<FindHit> {
    let (id, description) = match line.split_once('\t') {
        Some((id, description)) => (id, description),
        None => (line, ""),
    };
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    Some(FindHit {
        id: id.to_string(),
        description: description.trim().to_string(),
    })
}

/// First line of a `find` response that belongs to `species`.
pub fn first_species_hit(body: &str, species: &SpeciesCode) -> Option<FindHit> {
    let prefix = species.prefix();
    body.lines()
        .filter(|line| line.starts_with(&prefix))
        .find_map(parse_find_line)
}

/// First `species` line whose id is a valid identifier. A malformed id
/// such as `hsa:` is skipped in favour of the next line of that species.
pub fn first_species_id(body: &str, species: &SpeciesCode) -> Option<ExternalId> {
    let prefix = species.prefix();
    body.lines()
        .filter(|line| line.starts_with(&prefix))
        .filter_map(parse_find_line)
        .find_map(|hit| hit.id.parse().ok())
}

/// One tag of a record. `values[0]` is the text on the tagged line itself
/// (possibly empty), followed by its continuation lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatEntry {
    pub tag: String,
    pub values: Vec<String>,
}

impl FlatEntry {
    /// Text on the tagged line, without continuations.
    pub fn head(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatRecord {
    pub entries: Vec<FlatEntry>,
}

impl FlatRecord {
    pub fn parse(body: &str) -> Self {
        let mut entries: Vec<FlatEntry> = Vec::new();
        for line in body.lines() {
            if line.trim() == RECORD_END {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let continuation = line.starts_with(char::is_whitespace);
            if continuation {
                if let Some(last) = entries.last_mut() {
                    last.values.push(line.trim().to_string());
                }
                continue;
            }
            let (tag, rest) = match line.split_once(char::is_whitespace) {
                Some((tag, rest)) => (tag, rest.trim()),
                None => (line.trim_end(), ""),
            };
            entries.push(FlatEntry {
                tag: tag.to_string(),
                values: vec![rest.to_string()],
            });
        }
        Self { entries }
    }

    pub fn get(&self, tag: &str) -> Option<&FlatEntry> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }

    /// Non-empty values of every entry tagged `tag`, continuations included.
    pub fn values<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> {
        self.tagged(tag)
            .flat_map(|entry| entry.values.iter().map(String::as_str))
            .filter(|value| !value.is_empty())
    }

    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a FlatEntry> {
        self.entries.iter().filter(move |entry| entry.tag == tag)
    }

    /// Pathway ids from every line tagged `PATHWAY`, in encounter order.
    /// Only the tagged line counts; indented continuation lines are ignored.
    pub fn pathway_ids(&self) -> Vec<PathwayId> {
        self.tagged("PATHWAY")
            .filter_map(|entry| entry.head().split_whitespace().next())
            .filter_map(|token| token.parse().ok())
            .collect()
    }
}

/// [`FlatRecord::pathway_ids`] of a raw `get` response.
pub fn pathway_ids(body: &str) -> Vec<PathwayId> {
    FlatRecord::parse(body).pathway_ids()
}

pub type Edge = (String, String);

/// Nodes from `GENE`/`COMPOUND` lines and edges from `REL_PATHWAY` lines.
pub fn graph_elements(body: &str) -> (Vec<String>, Vec<Edge>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for line in body.lines() {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        match tokens.as_slice() {
            ["GENE" | "COMPOUND", node, ..] => nodes.push(node.to_string()),
            ["REL_PATHWAY", from, to, ..] => edges.push((from.to_string(), to.to_string())),
            _ => {}
        }
    }
    (nodes, edges)
}
