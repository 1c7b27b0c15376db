use kegg_pathway_mapper::domain::SpeciesCode;
use kegg_pathway_mapper::flatfile::{
    FlatRecord, first_species_hit, first_species_id, graph_elements, pathway_ids,
};

const FIND_BRCA1: &str = "mmu:12189\tBrca1; breast cancer 1, early onset\n\
hsa:672\tBRCA1, BRCAI, BRCC1; BRCA1 DNA repair associated\n\
hsa:8068\tBRCA1P1; BRCA1 pseudogene 1\n";

const TP53_RECORD: &str = "ENTRY       7157              CDS       T01001
SYMBOL      TP53, BCC7, BMFS5, LFS1, P53, TRP53
NAME        (RefSeq) tumor protein p53
PATHWAY     hsa01522  Endocrine resistance
            hsa04010  MAPK signaling pathway
PATHWAY     hsa04110  Cell cycle
///
";

fn species(code: &str) -> SpeciesCode {
    code.parse().unwrap()
}

#[test]
fn first_hit_for_species() {
    let hit = first_species_hit(FIND_BRCA1, &species("hsa")).unwrap();
    assert_eq!(hit.id, "hsa:672");
    assert_eq!(hit.description, "BRCA1, BRCAI, BRCC1; BRCA1 DNA repair associated");

    let mouse = first_species_id(FIND_BRCA1, &species("mmu")).unwrap();
    assert_eq!(mouse.as_str(), "mmu:12189");
    assert_eq!(mouse.namespace(), "mmu");
    assert_eq!(mouse.entry(), "12189");
}

#[test]
fn no_hit_for_absent_species() {
    assert_eq!(first_species_hit(FIND_BRCA1, &species("dme")), None);
    assert_eq!(first_species_hit("", &species("hsa")), None);
}

#[test]
fn malformed_species_id_falls_through_to_next_line() {
    let body = "hsa:\tbroken entry\nmmu:12189\tBrca1\nhsa:672\tBRCA1\n";

    assert_eq!(first_species_hit(body, &species("hsa")).unwrap().id, "hsa:");
    let id = first_species_id(body, &species("hsa")).unwrap();
    assert_eq!(id.as_str(), "hsa:672");

    assert_eq!(first_species_id("hsa:\tonly broken\n", &species("hsa")), None);
}

#[test]
fn only_tagged_pathway_lines_count() {
    let ids = pathway_ids(TP53_RECORD);
    let names = ids.iter().map(|id| id.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["hsa01522", "hsa04110"]);
}

#[test]
fn pathway_line_without_id_is_skipped() {
    assert!(pathway_ids("PATHWAY\nPATHWAY   \n").is_empty());
}

#[test]
fn record_entries_keep_continuations() {
    let record = FlatRecord::parse(TP53_RECORD);
    let pathways = record.values("PATHWAY").collect::<Vec<_>>();
    assert_eq!(
        pathways,
        vec![
            "hsa01522  Endocrine resistance",
            "hsa04010  MAPK signaling pathway",
            "hsa04110  Cell cycle",
        ]
    );
    assert_eq!(
        record.get("NAME").unwrap().values,
        vec!["(RefSeq) tumor protein p53"]
    );
}

#[test]
fn graph_elements_of_pathway_record() {
    let (nodes, edges) = graph_elements("GENE 10327 AKR1A1\nREL_PATHWAY hsa00010 hsa00020\n");
    assert_eq!(nodes, vec!["10327"]);
    assert_eq!(edges, vec![("hsa00010".to_string(), "hsa00020".to_string())]);
}
