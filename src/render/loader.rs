//! Background plate loader.
//! Receives load requests, resolves and fetches the bitmap off-thread, decodes
//! and downscales it, and reports back without blocking the event loop.
use crossbeam_channel::Receiver;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::PlateSource;
use crate::error::Result;
use crate::events::{LoadEvent, LoadFailed, PlateLoaded};
use crate::manifest::fetch_bytes;
use crate::render::plate::Plate;

/// Message sent to the background loader thread.
#[derive(Debug)]
pub enum LoaderMsg {
    /// Load this plate, downscaling so neither side exceeds `max_dim`.
    Load { source: PlateSource, max_dim: u32 },
    /// Stop the loader.
    Quit,
}

/// Resolve, fetch and decode one plate, reporting each stage to `progress`.
pub fn load_plate(
    source: &PlateSource,
    max_dim: u32,
    mut progress: impl FnMut(String),
) -> Result<Plate> {
    let plate = match source {
        PlateSource::Path(path) => {
            progress("Loading image...".to_owned());
            Plate::open(path)?
        }
        PlateSource::Url(url) => {
            progress("Loading image...".to_owned());
            Plate::decode(&fetch_bytes(url)?)?
        }
        PlateSource::Iiif(iiif) => {
            progress(format!("Resolving IIIF for {}...", iiif.ie));
            let url = iiif.resolve()?;
            progress("Loading image...".to_owned());
            Plate::decode(&fetch_bytes(&url)?)?
        }
    };
    debug!(width = plate.width(), height = plate.height(), "plate decoded");
    Ok(plate.fit_within(max_dim))
}

/// Spawn the request-driven loader; `notify` is called from the loader thread.
pub fn spawn_loader<F>(rx: Receiver<LoaderMsg>, notify: F) -> JoinHandle<()>
where
    F: Fn(LoadEvent) + Send + 'static,
{
    thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            match msg {
                LoaderMsg::Quit => break,
                LoaderMsg::Load { source, max_dim } => {
                    let name = source.label();
                    info!(source = %source, "loading plate");
                    match load_plate(&source, max_dim, |stage| notify(LoadEvent::Progress(stage))) {
                        Ok(plate) => notify(LoadEvent::Loaded(PlateLoaded { name, plate })),
                        Err(err) => {
                            warn!(source = %source, error = %err, "plate load failed");
                            notify(LoadEvent::Failed(LoadFailed {
                                name,
                                reason: err.to_string(),
                            }));
                        }
                    }
                }
            }
        }
        debug!("loader stopped");
    })
}
