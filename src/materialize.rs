use std::fs;
use std::io::Write;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ExternalId, PathwayId};
use crate::error::KeggError;
use crate::kegg::KeggClient;

/// Outcome of a single image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathwayArtifact {
    Image(Vec<u8>),
    Text(String),
    Error(String),
}

impl PathwayArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            PathwayArtifact::Image(_) => ArtifactKind::Image,
            PathwayArtifact::Text(_) => ArtifactKind::Text,
            PathwayArtifact::Error(_) => ArtifactKind::Error,
        }
    }

    pub fn file_name(&self, pathway: &PathwayId) -> String {
        match self {
            PathwayArtifact::Image(_) => pathway.image_file_name(),
            PathwayArtifact::Text(_) => pathway.text_file_name(),
            PathwayArtifact::Error(_) => pathway.error_file_name(),
        }
    }

    fn contents(&self) -> &[u8] {
        match self {
            PathwayArtifact::Image(bytes) => bytes,
            PathwayArtifact::Text(text) | PathwayArtifact::Error(text) => text.as_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Text,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializedArtifact {
    pub pathway_id: PathwayId,
    pub kind: ArtifactKind,
    pub path: Utf8PathBuf,
    pub highlighted: Vec<ExternalId>,
}

/// Fetches rendered pathway maps and saves exactly one file per call:
/// `<id>.png`, the `<id>.txt` text fallback, or `<id>_error.txt`.
pub struct ArtifactMaterializer<C: KeggClient> {
    client: C,
}

impl<C: KeggClient> ArtifactMaterializer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn fetch(&self, pathway: &PathwayId) -> PathwayArtifact {
        match self.client.get_image(pathway.as_str()) {
            Ok(payload) if payload.is_png() => PathwayArtifact::Image(payload.bytes),
            Ok(payload) => {
                warn!(
                    pathway = %pathway,
                    content_type = payload.content_type.as_deref().unwrap_or("none"),
                    "KEGG did not return an image, keeping text body"
                );
                PathwayArtifact::Text(String::from_utf8_lossy(&payload.bytes).into_owned())
            }
            Err(err) => {
                warn!(pathway = %pathway, error = %err, "pathway map request failed");
                PathwayArtifact::Error(format!(
                    "Error retrieving pathway map: {}",
                    err.detail()
                ))
            }
        }
    }

    /// Only filesystem failures are returned as errors; remote failures
    /// end up in the `_error.txt` artifact.
    ///
    /// `highlight_ids` does not change the request yet: KEGG's `image`
    /// operation has no parameter for it. The ids are carried into the
    /// result so callers can report them.
    pub fn materialize(
        &self,
        pathway: &PathwayId,
        highlight_ids: &[ExternalId],
        output_dir: &Utf8Path,
    ) -> Result<MaterializedArtifact, KeggError> {
        fs::create_dir_all(output_dir.as_std_path()).map_err(|err| {
            KeggError::Filesystem(format!("create output dir {output_dir}: {err}"))
        })?;
        debug!(pathway = %pathway, highlighted = highlight_ids.len(), "materializing pathway map");

        let artifact = self.fetch(pathway);
        let path = output_dir.join(artifact.file_name(pathway));
        write_atomic(&path, artifact.contents())?;
        info!(pathway = %pathway, path = %path, "saved pathway artifact");

        Ok(MaterializedArtifact {
            pathway_id: pathway.clone(),
            kind: artifact.kind(),
            path,
            highlighted: highlight_ids.to_vec(),
        })
    }
}

/// Writes through a temp file in the destination directory, so readers
/// never see a partial file.
pub(crate) fn write_atomic(dest: &Utf8Path, contents: &[u8]) -> Result<(), KeggError> {
    let parent = dest
        .parent()
        .ok_or_else(|| KeggError::Filesystem("invalid destination path".to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".kegg-map")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| KeggError::Filesystem(err.to_string()))?;
    temp.write_all(contents)
        .map_err(|err| KeggError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| KeggError::Filesystem(format!("write {dest}: {err}")))?;
    Ok(())
}

/// Most recently modified `.png` in `output_dir`, if any.
pub fn latest_image(output_dir: &Utf8Path) -> Result<Option<Utf8PathBuf>, KeggError> {
    if !output_dir.as_std_path().is_dir() {
        return Ok(None);
    }
    let entries = output_dir
        .read_dir_utf8()
        .map_err(|err| KeggError::Filesystem(err.to_string()))?;

    let mut newest: Option<(SystemTime, Utf8PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|err| KeggError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if path.extension() != Some("png") {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
            newest = Some((modified, path.to_path_buf()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}
