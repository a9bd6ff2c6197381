pub mod align;
pub mod config;
pub mod coords;
pub mod crop;
pub mod error;
pub mod events;
pub mod input;
pub mod loupe;
pub mod manifest;
pub mod picks;
pub mod schedule;
pub mod session;
pub mod processing {
    pub mod layout;
}
pub mod render {
    pub mod composite;
    pub mod gpu;
    pub mod loader;
    pub mod plate;
    pub mod viewer;
}

pub use config::{Configuration, PlateSource};
pub use render::viewer::run_viewer;
pub use session::StereoSession;
