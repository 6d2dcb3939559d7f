//! The phase pipeline: validate, fetch, map, generate, build, package, archive.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{info, info_span};

use crate::archive;
use crate::error::{Phase, Result};
use crate::invoke::{self, ToolRunner};
use crate::package::{self, PackageRequest, PackageSummary};
use crate::plan::{self, BuildPlan, Toolchain};
use crate::recipe::{Library, Recipe};
use crate::settings::BuildSettings;
use crate::source::{self, MAIN_BRANCH, SourceControl, SourceLayout};
use crate::validate;
use crate::version::{self, Revision, Version};

/// Inputs of one orchestrated run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub library: Library,
    /// Revision of the library being packaged.
    pub revision: Revision,
    /// Revisions of the companion sources; unpinned ones use the latest commit.
    pub pins: BTreeMap<Library, Revision>,
    pub settings: BuildSettings,
    pub toolchain: Toolchain,
    pub work_dir: PathBuf,
    pub package_dir: PathBuf,
    /// Write a `.tar.gz` of the package here when set.
    pub archive_dir: Option<PathBuf>,
    /// Reuse source trees that already exist instead of cloning again.
    pub keep_sources: bool,
}

impl RunConfig {
    pub fn recipe(&self) -> &'static Recipe {
        self.library.recipe()
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout::new(self.work_dir.join("src"))
    }

    fn revision_of(&self, library: Library) -> Revision {
        if library == self.library {
            self.revision
        } else {
            self.pins.get(&library).copied().unwrap_or_default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub version: Version,
    pub versions: BTreeMap<Library, Version>,
    pub plan: BuildPlan,
    pub package: PackageSummary,
    pub archive: Option<PathBuf>,
}

fn phase<T>(phase: Phase, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let span = info_span!("phase", %phase);
    let _enter = span.enter();
    f().map_err(|e| e.in_phase(phase))
}

/// Drives the external collaborators through the phases of a run.
pub struct Orchestrator<'a, S: ?Sized, R: ?Sized> {
    scm: &'a S,
    runner: &'a R,
}

impl<'a, S, R> Orchestrator<'a, S, R>
where
    S: SourceControl + ?Sized,
    R: ToolRunner + ?Sized,
{
    pub fn new(scm: &'a S, runner: &'a R) -> Self {
        Self { scm, runner }
    }

    /// The build plan for `config`, without touching sources or tools.
    pub fn plan(&self, config: &RunConfig) -> Result<BuildPlan> {
        phase(Phase::Validate, || {
            validate::settings(&config.settings, config.recipe())
        })?;
        phase(Phase::Map, || {
            plan::resolve(
                &config.settings,
                config.recipe(),
                &config.layout(),
                &config.toolchain,
            )
        })
    }

    /// Full run: fetch, build and package.
    pub fn run(&self, config: &RunConfig) -> Result<RunReport> {
        let recipe = config.recipe();
        let layout = config.layout();
        info!(library = %config.library, settings = %config.settings.describe(), "starting run");

        phase(Phase::Validate, || validate::settings(&config.settings, recipe))?;

        let versions = phase(Phase::Fetch, || {
            let requests: Vec<(Library, Revision)> = recipe
                .sources()
                .into_iter()
                .map(|lib| (lib, config.revision_of(lib)))
                .collect();
            source::fetch(self.scm, &layout, &requests, config.keep_sources)
        })?;
        phase(Phase::Validate, || {
            validate::versions(&config.settings, recipe, &versions)
        })?;
        let version = versions
            .get(&config.library)
            .copied()
            .unwrap_or_else(|| Version::from_commit_count(0));
        info!(library = %config.library, %version, "sources ready");

        let plan = phase(Phase::Map, || {
            plan::resolve(&config.settings, recipe, &layout, &config.toolchain)
        })?;
        phase(Phase::Generate, || invoke::generate(self.runner, &plan))?;
        phase(Phase::Build, || invoke::build(self.runner, &plan))?;

        let package = self.package(config, version)?;
        let archive = self.archive(config, version)?;

        Ok(RunReport {
            version,
            versions,
            plan,
            package,
            archive,
        })
    }

    /// Package an already built source tree.
    ///
    /// The version comes from the configured revision, or from the tree's
    /// history when the revision is `latest`.
    pub fn package_existing(&self, config: &RunConfig) -> Result<(PackageSummary, Option<PathBuf>)> {
        let version = match config.revision {
            Revision::Exact(version) => version,
            Revision::Latest => phase(Phase::Version, || {
                version::resolve(self.scm, &config.layout().dir(config.library), MAIN_BRANCH)
            })?,
        };
        let summary = self.package(config, version)?;
        let archive = self.archive(config, version)?;
        Ok((summary, archive))
    }

    fn package(&self, config: &RunConfig, version: Version) -> Result<PackageSummary> {
        phase(Phase::Package, || {
            let source_dir = config.layout().dir(config.library);
            let build_bin = invoke::locate_build_output(&source_dir)?;
            package::package(&PackageRequest {
                recipe: config.recipe(),
                settings: &config.settings,
                version,
                source_dir,
                build_bin,
                package_dir: config.package_dir.clone(),
            })
        })
    }

    fn archive(&self, config: &RunConfig, version: Version) -> Result<Option<PathBuf>> {
        let Some(dest) = &config.archive_dir else {
            return Ok(None);
        };
        phase(Phase::Archive, || {
            let name = archive::archive_name(config.recipe(), version, &config.settings);
            archive::create(&config.package_dir, dest, &name).map(Some)
        })
    }
}
