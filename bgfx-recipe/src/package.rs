//! Packaging: collect built artifacts into the canonical package layout.
//!
//! ```text
//! <package>/
//!   licenses/   LICENSE
//!   include/    *.h, *.inl (sub-paths kept)
//!   lib/        static / import libraries, debug symbols, unix shared objects
//!   bin/        windows DLLs and tools
//!   manifest.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::recipe::Recipe;
use crate::settings::{BuildSettings, CompilerFamily, Os};
use crate::version::Version;

/// File patterns collected for a platform.
///
/// Matches of `libs` and `bins` count toward the recipe's expected library
/// count; `symbols` are copied alongside but never counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub libs: Vec<&'static str>,
    pub symbols: Vec<&'static str>,
    pub bins: Vec<&'static str>,
    /// Prefix of the canonical library file name (`lib` for `libbgfx.a`).
    pub lib_prefix: &'static str,
}

pub fn artifact_set(settings: &BuildSettings) -> ArtifactSet {
    let shared = settings.options.shared();
    let mut set = ArtifactSet {
        libs: vec!["*.a"],
        symbols: Vec::new(),
        bins: Vec::new(),
        lib_prefix: "lib",
    };

    match settings.os {
        Os::Windows if settings.compiler.family == CompilerFamily::Msvc => {
            // Import libraries of a shared build are `*.lib` as well.
            set.libs = vec!["*.lib"];
            set.symbols = vec!["*.pdb"];
            set.lib_prefix = "";
            if shared {
                set.bins.push("*.dll");
            }
        }
        Os::Windows => {
            if shared {
                set.bins.push("*.dll");
            }
        }
        Os::Linux | Os::FreeBSD | Os::Android => {
            if shared {
                set.libs.push("*.so");
            }
        }
        Os::Macos => {
            if shared {
                set.libs.extend(["*.dylib", "*.so"]);
            }
        }
        Os::Ios => {}
    }
    set
}

/// Platform-uniform name for `file_name`, from the first rule it contains.
///
/// `bgfxRelease.lib` becomes `bgfx.lib`, `libbgfx-shared-libDebug.so` becomes
/// `libbgfx.so` (with prefix `lib`). Already canonical names map to themselves.
pub fn canonical_name(file_name: &str, rules: &[&str], prefix: &str) -> Option<String> {
    let rule = rules.iter().find(|rule| file_name.contains(*rule))?;
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    Some(format!("{prefix}{rule}{extension}"))
}

/// Everything the packager needs to know about one finished build.
#[derive(Debug, Clone)]
pub struct PackageRequest<'a> {
    pub recipe: &'a Recipe,
    pub settings: &'a BuildSettings,
    pub version: Version,
    /// Root of the built library's source tree (LICENSE, include/).
    pub source_dir: PathBuf,
    /// Directory the build tool wrote binaries to.
    pub build_bin: PathBuf,
    pub package_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSummary {
    pub package_dir: PathBuf,
    pub headers: usize,
    pub libs: Vec<String>,
    pub bins: Vec<String>,
}

/// Populate `request.package_dir`.
///
/// Work happens in a sibling `<package>.partial` directory that is removed on
/// failure and moved into place on success.
pub fn package(request: &PackageRequest<'_>) -> Result<PackageSummary> {
    let staging = Staging::new(&request.package_dir)?;
    let root = staging.path().to_path_buf();
    let recipe = request.recipe;
    let artifacts = artifact_set(request.settings);

    copy_license(&request.source_dir, &root.join("licenses"))?;

    let include_src = request.source_dir.join("include");
    let include_dst = root.join("include");
    let mut headers = copy_matching(&include_src, &include_dst, "*.h", true)?.len();
    headers += copy_matching(&include_src, &include_dst, "*.inl", true)?.len();

    let lib_dir = root.join("lib");
    let bin_dir = root.join("bin");

    // A shared build produces no static archive of its own, so shared objects
    // and DLLs count as well.
    let mut artifacts_found = Vec::new();
    for pattern in &artifacts.libs {
        artifacts_found.extend(copy_matching(&request.build_bin, &lib_dir, pattern, false)?);
    }
    for pattern in &artifacts.bins {
        artifacts_found.extend(copy_matching(&request.build_bin, &bin_dir, pattern, false)?);
    }
    let found = artifacts_found
        .iter()
        .filter(|p| !recipe.is_denylisted(&file_name(p)))
        .count();
    if found < recipe.expected_libs {
        return Err(Error::MissingLibraries {
            expected: recipe.expected_libs,
            found,
            dir: request.build_bin.clone(),
        });
    }
    for pattern in &artifacts.symbols {
        copy_matching(&request.build_bin, &lib_dir, pattern, false)?;
    }

    let tool_names: Vec<&str> = recipe.tools.iter().map(|t| t.name).collect();
    if request.settings.options.tools() {
        for tool in &tool_names {
            copy_matching(&request.build_bin, &bin_dir, &format!("{tool}*"), false)?;
        }
    }

    normalize_dir(&lib_dir, recipe.lib_names, artifacts.lib_prefix)?;
    let bin_rules: Vec<&str> = tool_names
        .iter()
        .chain(recipe.lib_names.iter())
        .copied()
        .collect();
    normalize_dir(&bin_dir, &bin_rules, "")?;

    remove_byproducts(&lib_dir, recipe)?;

    write_manifest(&root, request)?;

    let summary = PackageSummary {
        package_dir: request.package_dir.clone(),
        headers,
        libs: list_files(&lib_dir)?,
        bins: list_files(&bin_dir)?,
    };
    staging.commit()?;

    info!(
        package = %summary.package_dir.display(),
        headers = summary.headers,
        libs = ?summary.libs,
        bins = ?summary.bins,
        "package ready"
    );
    Ok(summary)
}

/// Copy files under `src` whose name matches `pattern` into `dst`.
///
/// Sub-paths are kept when `keep_path` is set, otherwise files land directly
/// in `dst`. A missing `src` copies nothing.
pub fn copy_matching(src: &Path, dst: &Path, pattern: &str, keep_path: bool) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(pattern)
        .map_err(|e| Error::package(format!("bad file pattern `{pattern}`: {e}")))?;
    if !src.is_dir() {
        return Ok(Vec::new());
    }

    let mut copied = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::package(format!("walking {}: {e}", src.display())))?;
        if !entry.file_type().is_file() || !pattern.matches(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let target = if keep_path {
            let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
            dst.join(relative)
        } else {
            dst.join(entry.file_name())
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        debug!(from = %entry.path().display(), to = %target.display(), "copied");
        copied.push(target);
    }
    Ok(copied)
}

/// Rename every file in `dir` to its canonical name. Returns the number of renames.
pub fn normalize_dir(dir: &Path, rules: &[&str], prefix: &str) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut renamed = 0;
    for name in list_files(dir)? {
        let Some(canonical) = canonical_name(&name, rules, prefix) else {
            continue;
        };
        if canonical == name {
            continue;
        }
        let target = dir.join(&canonical);
        if target.exists() {
            warn!(from = %name, to = %canonical, "overwriting existing artifact");
        }
        fs::rename(dir.join(&name), &target)?;
        debug!(from = %name, to = %canonical, "renamed");
        renamed += 1;
    }
    Ok(renamed)
}

fn remove_byproducts(lib_dir: &Path, recipe: &Recipe) -> Result<()> {
    for name in list_files(lib_dir)? {
        if recipe.is_denylisted(&name) {
            fs::remove_file(lib_dir.join(&name))?;
            debug!(file = %name, "removed byproduct");
        }
    }
    Ok(())
}

fn copy_license(source_dir: &Path, licenses: &Path) -> Result<()> {
    let license = source_dir.join("LICENSE");
    if !license.exists() {
        warn!("license file not found: {}", license.display());
        return Ok(());
    }
    fs::create_dir_all(licenses)?;
    fs::copy(&license, licenses.join("LICENSE"))?;
    Ok(())
}

fn write_manifest(root: &Path, request: &PackageRequest<'_>) -> Result<()> {
    let recipe = request.recipe;
    let settings = request.settings;
    let name = recipe.name();

    let mut body = String::new();
    body.push_str(&format!("name={name}\n"));
    body.push_str(&format!("version={}\n", request.version));
    body.push_str(&format!("license={}\n", recipe.license));
    body.push_str(&format!("os={}\n", settings.os));
    body.push_str(&format!("arch={}\n", settings.arch));
    body.push_str(&format!("build_type={}\n", settings.build_type));
    body.push_str(&format!("compiler={}\n", settings.compiler));
    body.push_str(&format!("link_type={}\n", link_type(settings)));
    body.push_str(&format!("libs={}\n", recipe.lib_names.join(",")));
    body.push_str(&format!(
        "system_libs={}\n",
        recipe.system_libs(settings.os).join(",")
    ));
    body.push_str(&format!("cmake_file_name={name}\n"));
    body.push_str(&format!("cmake_target_name={name}::{name}\n"));
    body.push_str(&format!("pkg_config_name={name}\n"));

    fs::write(root.join("manifest.txt"), body)?;
    Ok(())
}

pub fn link_type(settings: &BuildSettings) -> &'static str {
    if settings.options.shared() {
        "shared"
    } else {
        "static"
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Staging directory that is deleted unless committed.
struct Staging {
    path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl Staging {
    fn new(target: &Path) -> Result<Self> {
        let mut name = target
            .file_name()
            .ok_or_else(|| Error::package(format!("invalid package dir {}", target.display())))?
            .to_os_string();
        name.push(".partial");
        let path = target.with_file_name(name);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            target: target.to_path_buf(),
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) -> Result<()> {
        if self.target.exists() {
            fs::remove_dir_all(&self.target)?;
        }
        fs::rename(&self.path, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                warn!("could not remove {}: {e}", self.path.display());
            }
        }
    }
}
