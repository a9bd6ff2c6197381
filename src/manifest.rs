//! IIIF resolution for plates hosted behind an image service.
//!
//! A plate is named by its intellectual-entity (IE) number. The Presentation
//! 2.1 manifest for that entity lists canvases; the first image of the chosen
//! canvas carries the Image API service id from which the bitmap URL is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_MANIFEST_BASE: &str = "https://rosetta.slv.vic.gov.au/delivery/iiif/presentation/2.1";

/// Largest plate bitmap accepted over the network.
const MAX_IMAGE_BYTES: u64 = 256 * 1024 * 1024;

/// A plate addressed through IIIF, plus the Image API request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IiifPlate {
    #[serde(deserialize_with = "string_or_number")]
    pub ie: String,
    pub canvas_index: usize,
    pub manifest_base: String,
    pub region: String,
    pub size: String,
    pub rotation: String,
    pub quality: String,
    pub format: String,
}

impl Default for IiifPlate {
    fn default() -> Self {
        Self {
            ie: String::new(),
            canvas_index: 0,
            manifest_base: DEFAULT_MANIFEST_BASE.to_owned(),
            region: "full".to_owned(),
            size: "max".to_owned(),
            rotation: "0".to_owned(),
            quality: "default".to_owned(),
            format: "jpg".to_owned(),
        }
    }
}

impl IiifPlate {
    pub fn new(ie: impl Into<String>) -> Self {
        Self {
            ie: ie.into(),
            ..Self::default()
        }
    }

    pub fn manifest_url(&self) -> String {
        format!(
            "{}/{}/manifest",
            self.manifest_base.trim_end_matches('/'),
            encode_path_segment(&self.ie)
        )
    }

    pub fn image_url(&self, service_id: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            service_id.trim_end_matches('/'),
            self.region,
            self.size,
            self.rotation,
            self.quality,
            self.format
        )
    }

    /// Pick the image URL out of an already-fetched manifest document.
    pub fn image_url_from_manifest(&self, manifest: &Value) -> Result<String> {
        let service = image_service_id(manifest, self.canvas_index)?;
        Ok(self.image_url(service))
    }

    /// Fetch the manifest and resolve it to the plate bitmap URL.
    pub fn resolve(&self) -> Result<String> {
        let manifest_url = self.manifest_url();
        info!(ie = %self.ie, url = %manifest_url, "resolving IIIF manifest");
        let body = fetch_text(&manifest_url)?;
        let manifest: Value = serde_json::from_str(&body)
            .map_err(|e| Error::manifest(format!("{manifest_url}: {e}")))?;
        let url = self.image_url_from_manifest(&manifest)?;
        debug!(url = %url, "resolved plate image");
        Ok(url)
    }
}

/// Service id of the first image on canvas `index`, clamped to the last canvas.
pub fn image_service_id(manifest: &Value, index: usize) -> Result<&str> {
    let canvases = manifest
        .pointer("/sequences/0/canvases")
        .and_then(Value::as_array)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::manifest("no canvases found in manifest"))?;
    let canvas = &canvases[index.min(canvases.len() - 1)];
    canvas
        .pointer("/images/0/resource/service/@id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::manifest("no image service @id found in manifest canvas"))
}

pub fn fetch_text(url: &str) -> Result<String> {
    ureq::get(url)
        .call()
        .map_err(|e| Error::fetch(url, e))?
        .into_body()
        .read_to_string()
        .map_err(|e| Error::fetch(url, e))
}

pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let mut body = ureq::get(url).call().map_err(|e| Error::fetch(url, e))?.into_body();
    let bytes = body
        .with_config()
        .limit(MAX_IMAGE_BYTES)
        .read_to_vec()
        .map_err(|e| Error::fetch(url, e))?;
    debug!(url, bytes = bytes.len(), "fetched");
    Ok(bytes)
}

// IE numbers are often written unquoted in YAML.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

// Percent-encode everything outside the URL path unreserved set.
fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(ids: &[&str]) -> Value {
        let canvases: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "images": [ { "resource": { "service": { "@id": id } } } ] }))
            .collect();
        json!({ "sequences": [ { "canvases": canvases } ] })
    }

    #[test]
    fn manifest_url_uses_base_and_encoded_ie() {
        let p = IiifPlate::new("IE 12/3");
        assert_eq!(
            p.manifest_url(),
            "https://rosetta.slv.vic.gov.au/delivery/iiif/presentation/2.1/IE%2012%2F3/manifest"
        );
    }

    #[test]
    fn image_url_follows_image_api_pattern() {
        let p = IiifPlate::new("IE1");
        let url = p.image_url_from_manifest(&manifest(&["https://svc/iiif/abc"])).unwrap();
        assert_eq!(url, "https://svc/iiif/abc/full/max/0/default.jpg");
    }

    #[test]
    fn canvas_index_is_clamped() {
        let p = IiifPlate {
            canvas_index: 9,
            size: "!2000,2000".to_owned(),
            ..IiifPlate::new("IE1")
        };
        let url = p.image_url_from_manifest(&manifest(&["a", "b"])).unwrap();
        assert_eq!(url, "b/full/!2000,2000/0/default.jpg");
    }

    #[test]
    fn malformed_manifests_are_rejected() {
        let p = IiifPlate::new("IE1");
        assert!(matches!(
            p.image_url_from_manifest(&json!({ "sequences": [] })),
            Err(Error::Manifest(_))
        ));
        assert!(matches!(
            p.image_url_from_manifest(&json!({ "sequences": [ { "canvases": [ { "images": [] } ] } ] })),
            Err(Error::Manifest(_))
        ));
    }
}
