//! Asset materialization: copy every resolved variant of an asset reference
//! to its per-platform destination and produce the runtime registration stub.
//!
//! Two destination schemes exist:
//!
//! - **Flat** (`persist` off): all variants land under a single `assets/`
//!   directory as `<location>/name[@scale].ext`, where `<location>` is the
//!   reference's logical directory with path separators flattened to `_`.
//!   The layout is servable over HTTP under the configured public base path.
//! - **Persisted** (`persist` on): variants land in the platform-managed
//!   resource tree - fonts under `font/`, non-image media under `raw/`, and
//!   images/XML under the density folder implied by their scale tag.
//!
//! Materialization is a content copy, never a transformation, and is
//! idempotent for a fixed directory snapshot and option set.

use crate::variants::{ScaleKey, Variant, resolve_variants, variant_pattern};
use crate::{AssetOptions, AssetRef, Error, Result};
use path_clean::PathClean;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions copied into the `font/` category folder in persisted mode.
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Extensions copied into density folders in persisted mode.
const DENSITY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "xml"];

/// Extensions copied into the `raw/` category folder in persisted mode.
/// Anything outside the three sets is a hard error, never a silent default.
const RAW_EXTENSIONS: &[&str] = &[
    "mp3", "mp4", "m4a", "m4v", "aac", "aiff", "wav", "webm", "pdf", "html", "json", "zip", "svg",
];

/// Extensions the dimension probe understands.
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// One variant file emitted to its destination.
#[derive(Debug, Clone)]
pub struct EmittedVariant {
    /// Density bucket of the matched variant.
    pub scale: ScaleKey,

    /// Absolute path of the source file.
    pub source: PathBuf,

    /// Absolute path the file was copied to.
    pub destination: PathBuf,

    /// Hex SHA-256 of the file content.
    pub hash: String,
}

/// The materialized result of one asset reference: every chosen variant
/// copied to its destination, plus the metadata the runtime registration
/// stub carries. Created once per asset reference per build.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    /// The originating reference.
    pub reference: AssetRef,

    /// Combined content hash over all variants, ascending scale order.
    pub hash: String,

    /// Emitted variants, ascending scale order.
    pub files: Vec<EmittedVariant>,

    /// HTTP-servable location for flat-mode assets; `None` in persisted
    /// mode (the native layer resolves those by convention).
    pub http_location: Option<String>,

    /// Pixel dimensions of the asset at `@1x`, when the source is a
    /// recognized raster image.
    pub dimensions: Option<(u32, u32)>,

    /// Generated registration stub source.
    pub registration: String,
}

/// Materialize one asset reference: resolve variants, copy each to its
/// destination under `dest_root`, and generate the registration stub.
///
/// Fails with [`Error::NoVariantFound`] when no file in the reference's
/// directory matches the variant pattern - a required asset with zero
/// variants is never silently tolerated.
pub fn materialize(
    reference: &AssetRef,
    dest_root: &Path,
    options: &AssetOptions,
) -> Result<ResolvedAsset> {
    options.validate()?;

    let listing = list_directory(&reference.dir)?;
    let variants = resolve_variants(&listing, &reference.name, &reference.extension, options)?;

    if variants.is_empty() {
        return Err(Error::NoVariantFound {
            directory: reference.dir.display().to_string(),
            pattern: variant_pattern(&reference.name, &reference.extension, options),
        });
    }

    let suffix = location_suffix(&reference.location);

    let mut files = Vec::with_capacity(variants.len());
    for variant in variants.values() {
        files.push(emit_variant(reference, variant, dest_root, &suffix, options)?);
    }

    let hash = combined_hash(&files);
    let dimensions = probe_dimensions(reference, &files)?;
    let http_location = if options.persist {
        None
    } else {
        Some(http_location(options, &suffix))
    };

    let registration = registration_stub(
        reference,
        &files,
        &hash,
        http_location.as_deref(),
        dimensions,
    );

    if !options.persist {
        let stub_name = format!("{}.{}.js", reference.name, reference.extension);
        let stub_path = flat_destination(dest_root, &suffix, &stub_name)?;
        write_file(&stub_path, registration.as_bytes())?;
    }

    tracing::debug!(
        asset = %reference.name,
        variants = files.len(),
        persist = options.persist,
        "materialized asset"
    );

    Ok(ResolvedAsset {
        reference: reference.clone(),
        hash,
        files,
        http_location,
        dimensions,
        registration,
    })
}

/// List the file names in the asset's directory.
fn list_directory(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::IoError {
        message: format!("Failed to list asset directory: {}", dir.display()),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::IoError {
            message: format!("Failed to read entry in: {}", dir.display()),
            source: e,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Copy one variant to its destination and hash its content.
fn emit_variant(
    reference: &AssetRef,
    variant: &Variant,
    dest_root: &Path,
    suffix: &str,
    options: &AssetOptions,
) -> Result<EmittedVariant> {
    let source = reference.dir.join(&variant.file_name);
    let content = fs::read(&source).map_err(|e| Error::IoError {
        message: format!("Failed to read asset variant: {}", source.display()),
        source: e,
    })?;

    let destination = if options.persist {
        persisted_destination(reference, variant, dest_root)?
    } else {
        let file_name = format!(
            "{}{}.{}",
            reference.name,
            variant.scale.suffix(),
            reference.extension
        );
        flat_destination(dest_root, suffix, &file_name)?
    };

    write_file(&destination, &content)?;

    Ok(EmittedVariant {
        scale: variant.scale,
        source,
        destination,
        hash: hash_content(&content),
    })
}

/// Flatten a logical location into a single path segment: separators become
/// `_`, so `images/icons` contributes the `images_icons` directory and
/// same-named assets from different locations keep distinct destinations.
fn location_suffix(location: &str) -> String {
    location
        .trim_matches(['/', '\\'])
        .replace(['/', '\\'], "_")
}

/// Destination under the flat `assets/` directory, containment-checked: the
/// cleaned path must stay under `dest_root/assets` or the asset fails.
fn flat_destination(dest_root: &Path, suffix: &str, file_name: &str) -> Result<PathBuf> {
    let assets_root = dest_root.join("assets").clean();
    let mut destination = assets_root.clone();
    if !suffix.is_empty() {
        destination.push(suffix);
    }
    destination.push(file_name);
    let destination = destination.clean();

    if !destination.starts_with(&assets_root) {
        return Err(Error::DestinationOutsideRoot {
            destination: destination.display().to_string(),
            root: assets_root.display().to_string(),
        });
    }
    Ok(destination)
}

/// Destination under the platform-managed resource tree.
///
/// Fonts go to `font/`, non-image media to `raw/`, images/XML to the
/// density folder for their scale. An extension outside all three sets, or
/// a scale with no density folder, is a hard error.
fn persisted_destination(
    reference: &AssetRef,
    variant: &Variant,
    dest_root: &Path,
) -> Result<PathBuf> {
    let ext = reference.extension.as_str();
    let file_name = format!("{}.{}", reference.name, ext);

    let category_dir = if FONT_EXTENSIONS.contains(&ext) {
        "font".to_string()
    } else if DENSITY_EXTENSIONS.contains(&ext) {
        density_dir(variant.scale)
            .ok_or_else(|| Error::UnknownDensity {
                path: reference.dir.join(&variant.file_name).display().to_string(),
                scale: variant.scale.label(),
            })?
            .to_string()
    } else if RAW_EXTENSIONS.contains(&ext) {
        "raw".to_string()
    } else {
        return Err(Error::UnknownAssetCategory {
            path: reference.dir.join(&variant.file_name).display().to_string(),
            extension: reference.extension.clone(),
        });
    };

    let root = dest_root.clean();
    let destination = root.join(category_dir).join(file_name).clean();
    if !destination.starts_with(&root) {
        return Err(Error::DestinationOutsideRoot {
            destination: destination.display().to_string(),
            root: root.display().to_string(),
        });
    }
    Ok(destination)
}

/// Fixed density-to-folder table for persisted images/XML.
fn density_dir(scale: ScaleKey) -> Option<&'static str> {
    match (scale.scale() * 100.0).round() as u32 {
        75 => Some("drawable-ldpi"),
        100 => Some("drawable-mdpi"),
        150 => Some("drawable-hdpi"),
        200 => Some("drawable-xhdpi"),
        300 => Some("drawable-xxhdpi"),
        400 => Some("drawable-xxxhdpi"),
        _ => None,
    }
}

/// Write `content` to `path`, creating missing parent directories.
///
/// Concurrent materializations may share a destination folder; an
/// already-existing directory is not an error.
fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoError {
            message: format!("Failed to create directory: {}", parent.display()),
            source: e,
        })?;
    }
    fs::write(path, content).map_err(|e| Error::IoError {
        message: format!("Failed to write asset: {}", path.display()),
        source: e,
    })
}

/// Hash content using SHA-256, hex-encoded.
fn hash_content(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Combined asset hash: SHA-256 over the per-variant hashes joined in
/// ascending scale order, truncated to 32 hex characters.
fn combined_hash(files: &[EmittedVariant]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.hash.as_bytes());
    }
    let full = format!("{:x}", hasher.finalize());
    full[..32].to_string()
}

/// Pixel dimensions at `@1x`: read from the lowest-scale raster variant and
/// divide by its scale factor. Non-raster assets have no dimensions.
fn probe_dimensions(
    reference: &AssetRef,
    files: &[EmittedVariant],
) -> Result<Option<(u32, u32)>> {
    if !RASTER_EXTENSIONS.contains(&reference.extension.as_str()) {
        return Ok(None);
    }
    let Some(lowest) = files.first() else {
        return Ok(None);
    };

    let (width, height) =
        image::image_dimensions(&lowest.source).map_err(|e| Error::Dimensions {
            path: lowest.source.display().to_string(),
            source: e,
        })?;

    let scale = lowest.scale.scale();
    Ok(Some((
        (f64::from(width) / scale).round() as u32,
        (f64::from(height) / scale).round() as u32,
    )))
}

/// HTTP-servable base location for flat-mode assets:
/// `<public base>/assets[/<location suffix>]`.
///
/// The URL path mirrors the flat destination layout, so a runtime fetches a
/// variant by joining this location with `/name[@Nx].ext` - the same file
/// name the variant was emitted under.
fn http_location(options: &AssetOptions, suffix: &str) -> String {
    let base = match options.public_path.as_deref() {
        Some(base) => format!("{}/assets", base.trim_end_matches('/')),
        None => "/assets".to_string(),
    };
    if suffix.is_empty() {
        base
    } else {
        format!("{}/{}", base, suffix)
    }
}

/// Data block embedded in the registration stub. Field order is fixed by
/// the struct so the stub is byte-stable across runs.
#[derive(Serialize)]
struct RegistrationData<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    scales: Vec<f64>,
    hash: &'a str,
    #[serde(rename = "httpServerLocation", skip_serializing_if = "Option::is_none")]
    http_server_location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

/// Generate the registration stub: a snippet that registers the asset with
/// the runtime when evaluated by the running application.
fn registration_stub(
    reference: &AssetRef,
    files: &[EmittedVariant],
    hash: &str,
    http_location: Option<&str>,
    dimensions: Option<(u32, u32)>,
) -> String {
    let data = RegistrationData {
        name: &reference.name,
        kind: &reference.extension,
        scales: files.iter().map(|f| f.scale.scale()).collect(),
        hash,
        http_server_location: http_location,
        width: dimensions.map(|d| d.0),
        height: dimensions.map(|d| d.1),
    };
    // Struct serialization cannot fail; the data is plain strings/numbers.
    let json = serde_json::to_string(&data).unwrap_or_default();
    format!("module.exports = AssetRegistry.registerAsset({});\n", json)
}
