//! Destination profiles: where each kind of output file lands on disk.
//!
//! The two native packaging conventions diverge for non-entry chunks: iOS
//! keeps chunk code and source maps in the flat app-bundle resource folder,
//! Android keeps them in build-intermediate bundle/sourcemap directories.
//! Rather than branching on the platform at every copy site, each platform
//! maps to a [`PlatformLayout`] looked up once per profile.

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Target platform for the native packaging step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

impl std::str::FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(Error::InvalidConfig(format!(
                "unknown platform '{}' (expected 'ios' or 'android')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Ios => write!(f, "ios"),
            Platform::Android => write!(f, "android"),
        }
    }
}

/// Resolved destination directories for one output profile (local/native or
/// remote/hosted). All paths are absolute; directory creation is deferred to
/// copy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTargets {
    /// The entry bundle file.
    pub bundle_output_file: PathBuf,

    /// Directory for non-entry chunk code on Android.
    pub bundle_output_dir: PathBuf,

    /// The entry chunk's source map file.
    pub sourcemap_output_file: PathBuf,

    /// Directory for non-entry source maps on Android.
    pub sourcemap_output_dir: PathBuf,

    /// Directory for media assets (and all non-entry output on iOS).
    pub assets_dest_dir: PathBuf,
}

impl OutputTargets {
    /// Create targets from the two paths every profile needs; the rest are
    /// inferred. `bundle_output_dir` and `sourcemap_output_dir` default to
    /// the bundle file's directory, `sourcemap_output_file` to the bundle
    /// path with `.map` appended.
    pub fn new(bundle_output_file: impl Into<PathBuf>, assets_dest_dir: impl Into<PathBuf>) -> Self {
        let bundle_output_file = bundle_output_file.into();
        let bundle_output_dir = bundle_output_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let sourcemap_output_file = append_extension(&bundle_output_file, "map");
        let sourcemap_output_dir = bundle_output_dir.clone();

        Self {
            bundle_output_file,
            bundle_output_dir,
            sourcemap_output_file,
            sourcemap_output_dir,
            assets_dest_dir: assets_dest_dir.into(),
        }
    }

    /// Override the directory for non-entry chunk code.
    pub fn bundle_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle_output_dir = dir.into();
        self
    }

    /// Override the entry source map file.
    pub fn sourcemap_output_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.sourcemap_output_file = file.into();
        self
    }

    /// Override the directory for non-entry source maps.
    pub fn sourcemap_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sourcemap_output_dir = dir.into();
        self
    }

    /// The non-entry destination directories for `platform`.
    pub fn layout(&self, platform: Platform) -> PlatformLayout<'_> {
        match platform {
            // iOS: the flat app-bundle resource folder holds everything.
            Platform::Ios => PlatformLayout {
                non_entry_code_dir: &self.assets_dest_dir,
                non_entry_sourcemap_dir: &self.assets_dest_dir,
            },
            // Android: build-intermediate bundle/sourcemap directories.
            Platform::Android => PlatformLayout {
                non_entry_code_dir: &self.bundle_output_dir,
                non_entry_sourcemap_dir: &self.sourcemap_output_dir,
            },
        }
    }

    fn validate(&self, profile: &str) -> Result<()> {
        let required: [(&str, &Path); 3] = [
            ("bundleOutputFile", &self.bundle_output_file),
            ("bundleOutputDir", &self.bundle_output_dir),
            ("assetsDestDir", &self.assets_dest_dir),
        ];
        for (name, path) in required {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "{} is empty in the {} output profile",
                    name, profile
                )));
            }
        }
        Ok(())
    }
}

/// Non-entry destination directories for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformLayout<'a> {
    /// Where non-entry chunk code and `*.bundle.json` manifests go.
    pub non_entry_code_dir: &'a Path,

    /// Where non-entry source maps go.
    pub non_entry_sourcemap_dir: &'a Path,
}

/// Full options for one pipeline invocation: the platform and the local
/// profile, plus an optional remote profile for hosted chunks.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Target platform, deciding non-entry destinations.
    pub platform: Platform,

    /// Destination profile for native-embedded output.
    pub local: OutputTargets,

    /// Destination profile for remote chunk output. When absent, remote
    /// chunks produce no copy jobs (the caller opted out of hosting them).
    pub remote: Option<OutputTargets>,
}

impl OutputOptions {
    /// Create options for the given platform and local profile.
    pub fn new(platform: Platform, local: OutputTargets) -> Self {
        Self {
            platform,
            local,
            remote: None,
        }
    }

    /// Configure the remote-chunks output profile.
    pub fn remote(mut self, targets: OutputTargets) -> Self {
        self.remote = Some(targets);
        self
    }

    /// Validate the options. Fatal at pipeline construction time, before any
    /// graph or filesystem work starts.
    pub fn validate(&self) -> Result<()> {
        self.local.validate("local")?;
        if let Some(remote) = &self.remote {
            remote.validate("remote")?;
        }
        Ok(())
    }
}

/// Append `ext` after the path's existing extension (`main.jsbundle` ->
/// `main.jsbundle.map`).
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
