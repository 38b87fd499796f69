//! # ferropack-assets
//!
//! Density/platform variant resolution and native asset materialization.
//!
//! When a module references a file on disk (an image, a font, a video), the
//! native packaging step expects that reference to be expanded into every
//! density/platform variant present next to it (`logo.png`, `logo@2x.png`,
//! `logo@2x.android.png`, ...) and copied into the layout the platform's
//! resource system understands. This crate does that expansion in two layers:
//!
//! - [`variants`] finds and ranks the variant files for one logical name
//!   inside one directory (the VariantResolver).
//! - [`materializer`] computes destination paths for every chosen variant,
//!   copies them, and produces the runtime registration stub.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ferropack_assets::{AssetOptions, AssetRef, materialize};
//! use std::path::Path;
//!
//! # fn main() -> ferropack_assets::Result<()> {
//! let options = AssetOptions::new(["ios", "android"]);
//! let reference = AssetRef::new("/project/src/img", "src/img", "logo", "png");
//! let resolved = materialize(&reference, Path::new("/out"), &options)?;
//! println!("registered as {}", resolved.hash);
//! # Ok(()) }
//! ```
//!
//! Materialization is deterministic and idempotent: the same directory
//! snapshot and option set reproduce byte-identical destination files and an
//! identical registration stub.

pub mod materializer;
pub mod variants;

pub use materializer::{EmittedVariant, ResolvedAsset, materialize};
pub use variants::{ScaleKey, Variant, resolve_variants, variant_pattern};

use std::path::PathBuf;

/// Error types for asset resolution and materialization.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No variant file matched a required asset reference.
    #[error("No variant found for asset in '{directory}' (pattern tried: {pattern})")]
    NoVariantFound { directory: String, pattern: String },

    /// An asset's extension maps to no known destination category.
    #[error("Unknown asset category for '{path}' (extension '{extension}')")]
    UnknownAssetCategory { path: String, extension: String },

    /// A density tag has no folder in the platform resource table.
    #[error("No density folder for scale {scale} (variant '{path}')")]
    UnknownDensity { path: String, scale: String },

    /// A computed destination path escapes its configured output root.
    #[error("Destination '{destination}' escapes the output root '{root}'")]
    DestinationOutsideRoot { destination: String, root: String },

    /// Failed to read pixel dimensions from a raster variant.
    #[error("Failed to read image dimensions for '{path}'")]
    Dimensions {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for asset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One asset reference encountered during a build: a logical name, a file
/// extension, the directory the variant files live in, and the logical
/// location the referencing module knows the asset by.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Absolute directory containing the variant files.
    pub dir: PathBuf,

    /// Logical directory path of the asset as the application references it
    /// (e.g. `"images/icons"`; empty for a top-level asset). Two references
    /// with the same name and extension are distinct assets exactly when
    /// their locations differ, and the location keeps their flat-mode
    /// destinations apart.
    pub location: String,

    /// Logical asset name, without density or platform suffixes.
    pub name: String,

    /// File extension, without the leading dot.
    pub extension: String,
}

impl AssetRef {
    /// Create an asset reference.
    pub fn new(
        dir: impl Into<PathBuf>,
        location: impl Into<String>,
        name: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            location: location.into(),
            name: name.into(),
            extension: extension.into(),
        }
    }
}

/// Global options for asset materialization.
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Recognized platform tags, in declaration order. Priority is the
    /// reverse of this order: a tag declared later wins a density bucket
    /// over one declared earlier, and an untagged file ranks below all tags.
    pub platforms: Vec<String>,

    /// Extensions that admit a density suffix (`@2x` etc.).
    pub scalable_extensions: Vec<String>,

    /// Copy into the platform-managed resource tree (`font/`, `raw/`,
    /// density folders) instead of the flat assets directory.
    pub persist: bool,

    /// Public base path prefixed to the HTTP-servable location of
    /// non-persisted assets.
    pub public_path: Option<String>,
}

impl AssetOptions {
    /// Default set of extensions that admit density suffixes.
    pub const DEFAULT_SCALABLE: &'static [&'static str] =
        &["png", "jpg", "jpeg", "gif", "webp", "svg", "xml"];

    /// Create options with the given platform tags and defaults everywhere
    /// else (no persist, no public path, default scalable set).
    pub fn new<I, S>(platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platforms: platforms.into_iter().map(Into::into).collect(),
            scalable_extensions: Self::DEFAULT_SCALABLE.iter().map(|s| s.to_string()).collect(),
            persist: false,
            public_path: None,
        }
    }

    /// Enable or disable persisted (platform-managed) output.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Set the public base path for non-persisted assets.
    pub fn public_path(mut self, path: impl Into<String>) -> Self {
        self.public_path = Some(path.into());
        self
    }

    /// Validate the options.
    ///
    /// Called at materialization entry; a missing platform list is a
    /// configuration error surfaced before any filesystem work.
    pub fn validate(&self) -> Result<()> {
        if self.platforms.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one platform tag must be specified".to_string(),
            ));
        }
        if self.platforms.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidConfig(
                "platform tags must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `extension` admits density suffixes.
    pub fn is_scalable(&self, extension: &str) -> bool {
        self.scalable_extensions.iter().any(|e| e == extension)
    }
}
