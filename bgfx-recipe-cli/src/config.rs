//! `bgfx-recipe.toml` loading and resolution into a [`RunConfig`].
//!
//! Precedence, highest first: command line flags, `BGFX_RECIPE_*` environment
//! variables, the config file, built-in defaults. `ANDROID_NDK_ROOT` is only
//! consulted when the file does not name an NDK.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bgfx_recipe::{
    Arch, BuildSettings, BuildType, Compiler, CompilerFamily, Library, Options, Os, Revision,
    RunConfig, Toolchain,
};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "bgfx-recipe.toml";

pub const ENV_ANDROID_NDK: &str = "ANDROID_NDK_ROOT";
pub const ENV_WORK_DIR: &str = "BGFX_RECIPE_WORK_DIR";
pub const ENV_PACKAGE_DIR: &str = "BGFX_RECIPE_PACKAGE_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecipeConfig {
    pub library: Option<Library>,
    /// `latest` or an exact `major.minor.patch`.
    pub version: Option<Revision>,
    pub work_dir: Option<PathBuf>,
    pub package_dir: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub keep_sources: bool,
    pub settings: SettingsSection,
    pub options: OptionsSection,
    /// Revisions of bx and bimg when building a library on top of them.
    pub pins: BTreeMap<String, Revision>,
    pub toolchain: ToolchainSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsSection {
    pub os: Option<Os>,
    pub arch: Option<Arch>,
    pub compiler: Option<CompilerFamily>,
    pub compiler_version: Option<String>,
    pub build_type: Option<BuildType>,
    pub cppstd: Option<u32>,
    pub host_os: Option<Os>,
    pub host_arch: Option<Arch>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsSection {
    pub shared: bool,
    pub tools: bool,
    pub rtti: bool,
    pub profiler: bool,
}

impl OptionsSection {
    pub fn to_options(self) -> Options {
        let mut options = Options::empty();
        options.set(Options::SHARED, self.shared);
        options.set(Options::TOOLS, self.tools);
        options.set(Options::RTTI, self.rtti);
        options.set(Options::PROFILER, self.profiler);
        options
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSection {
    pub android_ndk: Option<PathBuf>,
    pub posix_shell: Option<PathBuf>,
    pub vcvars: Option<PathBuf>,
    pub jobs: Option<usize>,
}

/// Values given on the command line; `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub library: Option<Library>,
    pub revision: Option<Revision>,
    pub os: Option<Os>,
    pub arch: Option<Arch>,
    pub compiler: Option<CompilerFamily>,
    pub compiler_version: Option<String>,
    pub build_type: Option<BuildType>,
    pub shared: bool,
    pub tools: bool,
    pub work_dir: Option<PathBuf>,
    pub package_dir: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub keep_sources: bool,
}

impl RecipeConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`, or `bgfx-recipe.toml` from the current directory when it
    /// exists. No file at all means every value takes its default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config =
            Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(file = %path.display(), "loaded config");
        Ok(config)
    }

    /// Resolve everything into the inputs of a run.
    ///
    /// `env` looks up environment variables so callers can substitute the
    /// process environment.
    pub fn to_run_config(
        &self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<RunConfig> {
        let section = &self.settings;

        let os = match overrides.os.or(section.os).or_else(Os::host) {
            Some(os) => os,
            None => bail!("cannot detect the host operating system; set `settings.os`"),
        };
        let arch = match overrides.arch.or(section.arch).or_else(Arch::host) {
            Some(arch) => arch,
            None => bail!("cannot detect the host architecture; set `settings.arch`"),
        };
        let family = overrides
            .compiler
            .or(section.compiler)
            .unwrap_or_else(|| default_compiler(os));
        let version = overrides
            .compiler_version
            .clone()
            .or_else(|| section.compiler_version.clone())
            .unwrap_or_else(|| default_compiler_version(family).to_string());
        let build_type = overrides
            .build_type
            .or(section.build_type)
            .unwrap_or(BuildType::Release);

        let mut options = self.options.to_options();
        if overrides.shared {
            options |= Options::SHARED;
        }
        if overrides.tools {
            options |= Options::TOOLS;
        }

        let mut settings =
            BuildSettings::native(os, Compiler::new(family, version), arch, build_type, options);
        if section.host_os.is_some() || section.host_arch.is_some() {
            let host_os = section.host_os.unwrap_or(settings.host_os);
            let host_arch = section.host_arch.unwrap_or(settings.host_arch);
            settings = settings.with_host(host_os, host_arch);
        }
        if let Some(cppstd) = section.cppstd {
            settings = settings.with_cppstd(cppstd);
        }

        let mut toolchain = Toolchain {
            android_ndk: self
                .toolchain
                .android_ndk
                .clone()
                .or_else(|| env(ENV_ANDROID_NDK).map(PathBuf::from)),
            vcvars: self.toolchain.vcvars.clone(),
            jobs: overrides.jobs.or(self.toolchain.jobs),
            ..Toolchain::default()
        };
        if let Some(shell) = &self.toolchain.posix_shell {
            toolchain.posix_shell = shell.clone();
        }

        let work_dir = overrides
            .work_dir
            .clone()
            .or_else(|| env(ENV_WORK_DIR).map(PathBuf::from))
            .or_else(|| self.work_dir.clone())
            .unwrap_or_else(|| PathBuf::from("build"));
        let package_dir = overrides
            .package_dir
            .clone()
            .or_else(|| env(ENV_PACKAGE_DIR).map(PathBuf::from))
            .or_else(|| self.package_dir.clone())
            .unwrap_or_else(|| PathBuf::from("package"));

        let mut pins = BTreeMap::new();
        for (name, revision) in &self.pins {
            let library: Library = name
                .parse()
                .with_context(|| format!("invalid entry `{name}` in [pins]"))?;
            pins.insert(library, *revision);
        }

        Ok(RunConfig {
            library: overrides.library.or(self.library).unwrap_or(Library::Bgfx),
            revision: overrides.revision.or(self.version).unwrap_or_default(),
            pins,
            settings,
            toolchain,
            work_dir,
            package_dir,
            archive_dir: overrides.archive_dir.clone().or_else(|| self.archive_dir.clone()),
            keep_sources: overrides.keep_sources || self.keep_sources,
        })
    }
}

fn default_compiler(os: Os) -> CompilerFamily {
    match os {
        Os::Windows => CompilerFamily::Msvc,
        Os::Linux => CompilerFamily::Gcc,
        Os::FreeBSD | Os::Android => CompilerFamily::Clang,
        Os::Macos | Os::Ios => CompilerFamily::AppleClang,
    }
}

/// Only the Visual Studio version selects anything; other compilers are
/// whatever the environment provides.
fn default_compiler_version(family: CompilerFamily) -> &'static str {
    match family {
        CompilerFamily::Msvc => "193",
        _ => "system",
    }
}
