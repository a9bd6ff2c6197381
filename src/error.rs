use thiserror::Error;

/// Library error type for plate loading.
///
/// Everything past a successful load (picking, alignment, viewport geometry,
/// compositing) is total and never produces one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// The image-service manifest did not have the expected shape.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A network request for the manifest or the plate bitmap failed.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The plate bitmap could not be decoded.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// The decoded plate has a zero dimension.
    #[error("plate has zero size ({width}x{height})")]
    EmptyPlate { width: u32, height: u32 },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(Error::manifest("x").to_string().contains("manifest error:"));
        assert!(
            Error::fetch("http://a", "404")
                .to_string()
                .contains("fetch failed for http://a: 404")
        );
        let empty = Error::EmptyPlate {
            width: 0,
            height: 10,
        };
        assert_eq!(empty.to_string(), "plate has zero size (0x10)");
    }
}
