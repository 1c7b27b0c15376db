use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kegg_pathway_mapper::app::{App, MapRequest, ProgressEvent, ProgressSink};
use kegg_pathway_mapper::domain::{GeneName, parse_gene_list};
use kegg_pathway_mapper::error::KeggError;
use kegg_pathway_mapper::kegg::{ImagePayload, KeggClient};
use kegg_pathway_mapper::materialize::ArtifactKind;
use kegg_pathway_mapper::pacing::Pacing;

#[derive(Default)]
struct MockKegg {
    genes: HashMap<String, String>,
    records: HashMap<String, String>,
    broken_images: Vec<String>,
    image_calls: Mutex<Vec<String>>,
}

impl MockKegg {
    fn gene(mut self, name: &str, id: &str) -> Self {
        self.genes
            .insert(name.to_string(), format!("{id}\t{name}; mocked gene\n"));
        self
    }

    fn record(mut self, id: &str, pathways: &[&str]) -> Self {
        let body = pathways
            .iter()
            .map(|pathway| format!("PATHWAY     {pathway}  Mocked pathway\n"))
            .collect::<String>();
        self.records.insert(id.to_string(), body);
        self
    }

    fn broken_image(mut self, pathway: &str) -> Self {
        self.broken_images.push(pathway.to_string());
        self
    }
}

impl KeggClient for MockKegg {
    fn find(&self, _database: &str, query: &str) -> Result<String, KeggError> {
        Ok(self.genes.get(query).cloned().unwrap_or_default())
    }

    fn get(&self, id: &str) -> Result<String, KeggError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| KeggError::KeggHttp("timed out".to_string()))
    }

    fn get_image(&self, id: &str) -> Result<ImagePayload, KeggError> {
        self.image_calls.lock().unwrap().push(id.to_string());
        if self.broken_images.iter().any(|pathway| pathway == id) {
            return Err(KeggError::KeggHttp("Network Error".to_string()));
        }
        Ok(ImagePayload {
            content_type: Some("image/png".to_string()),
            bytes: id.as_bytes().to_vec(),
        })
    }
}

/// Records when each request reached the client.
struct TimedKegg {
    inner: MockKegg,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl TimedKegg {
    fn new(inner: MockKegg) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }
}

impl KeggClient for TimedKegg {
    fn find(&self, database: &str, query: &str) -> Result<String, KeggError> {
        self.log(format!("find {query}"));
        self.inner.find(database, query)
    }

    fn get(&self, id: &str) -> Result<String, KeggError> {
        self.log(format!("get {id}"));
        self.inner.get(id)
    }

    fn get_image(&self, id: &str) -> Result<ImagePayload, KeggError> {
        self.log(format!("image {id}"));
        self.inner.get_image(id)
    }
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn request(genes: &str, output_dir: &Utf8PathBuf) -> MapRequest {
    MapRequest {
        genes: parse_gene_list(genes),
        species: "hsa".parse().unwrap(),
        output_dir: output_dir.clone(),
    }
}

fn temp_output() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("output")).unwrap();
    (temp, dir)
}

#[test]
fn maps_genes_to_saved_pathway_maps() {
    let (_temp, dir) = temp_output();
    let client = MockKegg::default()
        .gene("BRCA1", "hsa:672")
        .gene("TP53", "hsa:7157")
        .record("hsa:672", &["hsa03440", "hsa05224"])
        .record("hsa:7157", &["hsa04110", "hsa04115"]);
    let app = App::new(client, Pacing::unpaced(2));
    let sink = RecordingSink::default();

    let report = app.map_genes(request("BRCA1, TP53", &dir), &sink).unwrap();

    assert_eq!(report.gene_to_id.len(), 2);
    assert!(report.unresolved.is_empty());
    assert_eq!(report.artifacts.len(), 2);
    assert!(report.artifacts.iter().all(|a| a.kind == ArtifactKind::Image));
    assert_eq!(fs::read(dir.join("hsa03440.png")).unwrap(), b"hsa03440");
    assert_eq!(fs::read(dir.join("hsa04110.png")).unwrap(), b"hsa04110");
    assert!(!dir.join("hsa04115.png").as_std_path().exists());
    assert_eq!(
        report.message,
        "Pathway maps generated successfully for the following genes: BRCA1, TP53"
    );

    let messages = sink.messages.lock().unwrap();
    assert!(messages[0].starts_with("phase=Resolve"));
    assert!(messages.iter().any(|m| m.starts_with("phase=Materialize")));
}

#[test]
fn requests_stay_paced_across_stages() {
    let (_temp, dir) = temp_output();
    let client = TimedKegg::new(
        MockKegg::default()
            .gene("BRCA1", "hsa:672")
            .record("hsa:672", &["hsa03440"]),
    );
    let interval = Duration::from_millis(100);
    let app = App::new(&client, Pacing::new(1, interval));

    app.map_genes(request("BRCA1", &dir), &RecordingSink::default())
        .unwrap();

    let calls = client.calls.lock().unwrap();
    let names = calls.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["find BRCA1", "get hsa:672", "image hsa03440"]);
    for pair in calls.windows(2) {
        let gap = pair[1].1.duration_since(pair[0].1);
        assert!(
            gap >= interval - Duration::from_millis(5),
            "{} -> {} after {gap:?}",
            pair[0].0,
            pair[1].0
        );
    }
}

#[test]
fn unresolved_genes_and_empty_records_are_reported() {
    let (_temp, dir) = temp_output();
    let client = MockKegg::default()
        .gene("EGFR", "hsa:1956")
        .gene("ORPHAN", "hsa:9")
        .record("hsa:1956", &["hsa04012"])
        .record("hsa:9", &[]);
    let app = App::new(client, Pacing::unpaced(1));

    let report = app
        .map_genes(request("EGFR, ORPHAN, MISSING, MISSING", &dir), &RecordingSink::default())
        .unwrap();

    assert_eq!(report.unresolved, vec!["MISSING".parse::<GeneName>().unwrap()]);
    assert_eq!(report.id_to_pathways.len(), 2);
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(report.artifacts[0].pathway_id.as_str(), "hsa04012");
}

#[test]
fn shared_first_pathway_is_written_once() {
    let (_temp, dir) = temp_output();
    let client = MockKegg::default()
        .gene("CDK4", "hsa:1019")
        .gene("CDK6", "hsa:1021")
        .record("hsa:1019", &["hsa04110"])
        .record("hsa:1021", &["hsa04110", "hsa04218"]);
    let app = App::new(client, Pacing::unpaced(4));

    let report = app
        .map_genes(request("CDK4,CDK6", &dir), &RecordingSink::default())
        .unwrap();

    assert_eq!(report.artifacts.len(), 1);
    let highlighted = report.artifacts[0]
        .highlighted
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(highlighted, vec!["hsa:1019", "hsa:1021"]);
}

#[test]
fn failed_image_leaves_error_artifact_and_run_succeeds() {
    let (_temp, dir) = temp_output();
    let client = MockKegg::default()
        .gene("AKT1", "hsa:207")
        .record("hsa:207", &["hsa04151"])
        .broken_image("hsa04151");
    let app = App::new(client, Pacing::unpaced(1));

    let report = app
        .map_genes(request("AKT1", &dir), &RecordingSink::default())
        .unwrap();

    assert_eq!(report.artifacts[0].kind, ArtifactKind::Error);
    let content = fs::read_to_string(dir.join("hsa04151_error.txt")).unwrap();
    assert!(content.contains("Error retrieving pathway map: Network Error"));
}

#[test]
fn empty_gene_list_is_rejected() {
    let (_temp, dir) = temp_output();
    let app = App::new(MockKegg::default(), Pacing::unpaced(1));

    let err = app
        .map_genes(request(" , \n", &dir), &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, KeggError::NoGenes);
}

#[test]
fn nothing_resolved_is_an_error() {
    let (_temp, dir) = temp_output();
    let app = App::new(MockKegg::default(), Pacing::unpaced(1));

    let err = app
        .map_genes(request("NOTAGENE", &dir), &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, KeggError::NoIdentifiers);
    assert_eq!(err.to_string(), "No KEGG IDs found for the provided genes.");
    assert!(!dir.as_std_path().exists());
}

#[test]
fn report_serializes_to_json() {
    let (_temp, dir) = temp_output();
    let client = MockKegg::default()
        .gene("MYC", "hsa:4609")
        .record("hsa:4609", &["hsa04010"]);
    let app = App::new(client, Pacing::unpaced(1));

    let report = app
        .map_genes(request("MYC", &dir), &RecordingSink::default())
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["gene_to_id"]["MYC"], "hsa:4609");
    assert_eq!(json["id_to_pathways"]["hsa:4609"][0], "hsa04010");
    assert_eq!(json["artifacts"][0]["kind"], "image");
    assert_eq!(json["artifacts"][0]["path"], dir.join("hsa04010.png").as_str());
}
