use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};

use crate::crop::CropRect;
use crate::manifest::IiifPlate;
use crate::picks::PickOrder;
use crate::render::composite::{ModeKind, WiggleParams};

/// Where the plate bitmap comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateSource {
    Path(PathBuf),
    Url(String),
    Iiif(IiifPlate),
}

impl PlateSource {
    /// Interpret a bare command-line argument: `http(s)://` is a URL, anything else a file.
    pub fn from_arg(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            PlateSource::Url(raw.to_owned())
        } else {
            PlateSource::Path(PathBuf::from(raw))
        }
    }

    /// Short human-readable name for status lines.
    pub fn label(&self) -> String {
        match self {
            PlateSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            PlateSource::Url(u) => u.rsplit('/').next().unwrap_or(u).to_owned(),
            PlateSource::Iiif(i) => i.ie.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            PlateSource::Path(p) => {
                ensure!(!p.as_os_str().is_empty(), "plate.path must not be empty")
            }
            PlateSource::Url(u) => ensure!(
                u.starts_with("http://") || u.starts_with("https://"),
                "plate.url must be an http(s) URL"
            ),
            PlateSource::Iiif(i) => {
                ensure!(!i.ie.trim().is_empty(), "plate.iiif.ie must not be empty");
                ensure!(
                    !i.manifest_base.trim().is_empty(),
                    "plate.iiif.manifest-base must not be empty"
                );
            }
        }
        Ok(())
    }
}

impl fmt::Display for PlateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlateSource::Path(p) => write!(f, "{}", p.display()),
            PlateSource::Url(u) => f.write_str(u),
            PlateSource::Iiif(i) => write!(f, "IIIF {}", i.ie),
        }
    }
}

impl<'de> Deserialize<'de> for PlateSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PlateSourceVisitor)
    }
}

struct PlateSourceVisitor;

impl<'de> Visitor<'de> for PlateSourceVisitor {
    type Value = PlateSource;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a plate path or URL, or a map with one of: path, url, iiif")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(PlateSource::from_arg(v))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut source: Option<PlateSource> = None;
        while let Some(key) = map.next_key::<String>()? {
            if source.is_some() {
                return Err(de::Error::custom(format!(
                    "plate must name exactly one source, found extra key '{key}'"
                )));
            }
            source = Some(match key.as_str() {
                "path" => PlateSource::Path(map.next_value()?),
                "url" => PlateSource::Url(map.next_value()?),
                "iiif" => PlateSource::Iiif(map.next_value()?),
                other => {
                    return Err(de::Error::unknown_field(other, &["path", "url", "iiif"]));
                }
            });
        }
        source.ok_or_else(|| de::Error::missing_field("path"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Plate to open; the CLI may supply or override it.
    pub plate: Option<PlateSource>,
    /// Landmark capture order. `L_*` names are picked on the left half, `R_*` on the right.
    pub pick_order: PickOrder,
    /// Compositing mode at startup.
    pub mode: ModeKind,
    pub wiggle: WiggleParams,
    /// Initial crop of the stereo frame; `null` disables cropping.
    pub crop: Option<CropRect>,
    /// Smallest crop box side, in logical pixels.
    pub crop_min_px: f32,
    /// Plates larger than this on either side are downscaled before upload.
    pub max_texture_dim: u32,
    pub window_title: String,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&s).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.pick_order.is_empty(), "pick-order must not be empty");
        ensure!(
            self.wiggle.hz.is_finite() && self.wiggle.hz > 0.0,
            "wiggle.hz must be a positive number"
        );
        ensure!(
            (0.0..=1.0).contains(&self.wiggle.blend),
            "wiggle.blend must be within [0, 1]"
        );
        if let Some(crop) = &self.crop {
            let bounds = [crop.x0, crop.y0, crop.x1, crop.y1];
            ensure!(
                bounds.iter().all(|b| (0.0..=1.0).contains(b)),
                "crop bounds must be within [0, 1]"
            );
        }
        ensure!(
            self.crop_min_px.is_finite() && self.crop_min_px >= 0.0,
            "crop-min-px must not be negative"
        );
        ensure!(
            self.max_texture_dim > 0,
            "max-texture-dim must be greater than zero"
        );
        if let Some(plate) = &self.plate {
            plate.validate()?;
        }
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            plate: None,
            pick_order: PickOrder::default(),
            mode: ModeKind::default(),
            wiggle: WiggleParams::default(),
            crop: Some(CropRect::default()),
            crop_min_px: 24.0,
            max_texture_dim: 8192,
            window_title: "Stereo Plate".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_plate_is_path_or_url() {
        let c: Configuration = serde_yaml::from_str("plate: shots/plate.jpg\n").unwrap();
        assert_eq!(c.plate, Some(PlateSource::Path("shots/plate.jpg".into())));
        let c: Configuration = serde_yaml::from_str("plate: https://x/y.jpg\n").unwrap();
        assert_eq!(c.plate, Some(PlateSource::Url("https://x/y.jpg".into())));
    }

    #[test]
    fn plate_map_rejects_two_sources() {
        let yaml = "plate:\n  path: a.jpg\n  url: https://x/y.jpg\n";
        assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
    }

    #[test]
    fn label_is_short() {
        assert_eq!(PlateSource::Path("/a/b/c.png".into()).label(), "c.png");
        assert_eq!(PlateSource::from_arg("https://h/full/0/default.jpg").label(), "default.jpg");
        assert_eq!(PlateSource::Iiif(IiifPlate::new("IE42")).label(), "IE42");
    }
}
