//! Variant resolution: find and rank the density/platform variant files for
//! one logical asset name inside one directory.
//!
//! Variant filenames follow `name[@NxSCALE][.PLATFORM].ext`. The density
//! suffix is only permitted for scalable extensions; the platform suffix must
//! be one of the recognized tags or absent. Two files competing for the same
//! density bucket are ranked by platform priority: a tag declared later in
//! the caller-supplied platform list wins over one declared earlier, and an
//! untagged file ranks below every tag.

use crate::{AssetOptions, Result};
use regex::Regex;
use std::collections::BTreeMap;

/// A density bucket key, stored as scale in hundredths so buckets order and
/// compare exactly (`100` = `@1x`, `75` = `@0.75x`, `150` = `@1.5x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScaleKey(u32);

impl ScaleKey {
    /// The default bucket for files with no density suffix.
    pub const ONE: ScaleKey = ScaleKey(100);

    /// Parse a density tag's numeric part (`"2"`, `"1.5"`, `"0.75"`).
    ///
    /// Returns `None` for zero or non-numeric input; the filename pattern
    /// only produces digit groups, so this is defensive only at the API edge.
    pub fn parse(tag: &str) -> Option<ScaleKey> {
        let scale: f64 = tag.parse().ok()?;
        if scale <= 0.0 {
            return None;
        }
        Some(ScaleKey((scale * 100.0).round() as u32))
    }

    /// Create a key from a scale factor.
    pub fn from_scale(scale: f64) -> ScaleKey {
        ScaleKey((scale * 100.0).round() as u32)
    }

    /// The scale factor this bucket represents.
    pub fn scale(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// The bucket label as it appears in filenames (`"@2x"`, `"@1.5x"`).
    pub fn label(self) -> String {
        if self.0 % 100 == 0 {
            format!("@{}x", self.0 / 100)
        } else {
            format!("@{}x", self.scale())
        }
    }

    /// The filename suffix for this bucket: empty at `@1x`, the label
    /// otherwise.
    pub fn suffix(self) -> String {
        if self == ScaleKey::ONE {
            String::new()
        } else {
            self.label()
        }
    }
}

/// One physical file implementing an asset reference at a specific density
/// bucket, optionally restricted to one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Density bucket this file occupies.
    pub scale: ScaleKey,

    /// Platform tag, or `None` for an untagged (any-platform) file.
    pub platform: Option<String>,

    /// The filename inside the asset's directory.
    pub file_name: String,
}

/// Build the variant filename pattern for `name` + `extension` under the
/// given options. Exposed so "no variant found" errors can name the pattern
/// that was tried.
pub fn variant_pattern(name: &str, extension: &str, options: &AssetOptions) -> String {
    let platforms = options
        .platforms
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    let density = if options.is_scalable(extension) {
        r"(?:@(?P<scale>\d+(?:\.\d+)?)x)?"
    } else {
        ""
    };
    format!(
        "^{name}{density}(?:\\.(?P<platform>{platforms}))?\\.{ext}$",
        name = regex::escape(name),
        density = density,
        platforms = platforms,
        ext = regex::escape(extension),
    )
}

/// Resolve every variant of one logical asset from a directory listing.
///
/// Returns a mapping from density bucket to the single chosen variant: at
/// most one entry per bucket, deterministic given the same listing and
/// platform priority order. An empty map means no file matched; the caller
/// decides whether that is fatal (it is for a required asset reference).
pub fn resolve_variants(
    files: &[String],
    name: &str,
    extension: &str,
    options: &AssetOptions,
) -> Result<BTreeMap<ScaleKey, Variant>> {
    options.validate()?;

    let pattern = variant_pattern(name, extension, options);
    let matcher = Regex::new(&pattern).map_err(|e| {
        crate::Error::InvalidConfig(format!("invalid variant pattern '{}': {}", pattern, e))
    })?;

    let mut buckets: BTreeMap<ScaleKey, Variant> = BTreeMap::new();

    for file_name in files {
        let Some(captures) = matcher.captures(file_name) else {
            continue;
        };

        let scale = match captures.name("scale") {
            Some(tag) => match ScaleKey::parse(tag.as_str()) {
                Some(key) => key,
                None => continue,
            },
            None => ScaleKey::ONE,
        };
        let platform = captures.name("platform").map(|m| m.as_str().to_string());

        let candidate = Variant {
            scale,
            platform,
            file_name: file_name.clone(),
        };

        match buckets.get(&scale) {
            Some(existing)
                if platform_priority(existing.platform.as_deref(), options)
                    >= platform_priority(candidate.platform.as_deref(), options) => {}
            _ => {
                buckets.insert(scale, candidate);
            }
        }
    }

    Ok(buckets)
}

/// Priority of a platform tag: reverse of declaration order, untagged lowest.
fn platform_priority(platform: Option<&str>, options: &AssetOptions) -> usize {
    match platform {
        None => 0,
        Some(tag) => options
            .platforms
            .iter()
            .position(|p| p == tag)
            .map(|i| i + 1)
            .unwrap_or(0),
    }
}
