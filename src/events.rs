use crate::render::plate::Plate;

/// Progress and outcome of one plate load, in the order the loader emits them.
#[derive(Debug)]
pub enum LoadEvent {
    /// Human-readable stage, e.g. resolving a manifest or fetching the bitmap.
    Progress(String),
    Loaded(PlateLoaded),
    Failed(LoadFailed),
}

#[derive(Debug)]
pub struct PlateLoaded {
    pub name: String,
    pub plate: Plate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailed {
    pub name: String,
    pub reason: String,
}
