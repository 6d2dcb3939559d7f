//! End-to-end runs with recording source-control and tool fakes

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bgfx_recipe::{
    Arch, BuildSettings, BuildType, Compiler, CompilerFamily, Error, Invocation, Library, Options,
    Orchestrator, Os, Phase, Result, Revision, RunConfig, SourceControl, ToolRunner, Toolchain,
    Version,
};

/// Clones produce a minimal source tree; commit counts come from a table.
struct FakeGit {
    counts: BTreeMap<&'static str, u64>,
    clones: RefCell<Vec<String>>,
    checkouts: RefCell<Vec<String>>,
}

impl FakeGit {
    fn new(bx: u64, bimg: u64, bgfx: u64) -> Self {
        Self {
            counts: BTreeMap::from([("bx", bx), ("bimg", bimg), ("bgfx", bgfx)]),
            clones: RefCell::new(Vec::new()),
            checkouts: RefCell::new(Vec::new()),
        }
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl SourceControl for FakeGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let name = dir_name(dest);
        assert!(url.ends_with(&format!("/{name}.git")), "{url} cloned into {name}");
        fs::create_dir_all(dest.join("include").join(&name))?;
        fs::write(dest.join("LICENSE"), "BSD 2-Clause")?;
        fs::write(dest.join("include").join(&name).join(format!("{name}.h")), "#pragma once")?;
        self.clones.borrow_mut().push(name);
        Ok(())
    }

    fn commit_count(&self, repo: &Path, _branch: &str) -> Result<u64> {
        Ok(self.counts[dir_name(repo).as_str()])
    }

    fn checkout(&self, repo: &Path, rev: &str) -> Result<()> {
        self.checkouts
            .borrow_mut()
            .push(format!("{}@{rev}", dir_name(repo)));
        Ok(())
    }
}

/// Records every invocation and writes the artifact a make target would produce.
#[derive(Default)]
struct FakeTools {
    calls: RefCell<Vec<Invocation>>,
    fail_target: Option<&'static str>,
}

const TOOL_NAMES: [&str; 4] = ["shaderc", "texturev", "geometryc", "geometryv"];

impl ToolRunner for FakeTools {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        self.calls.borrow_mut().push(invocation.clone());
        if invocation.program != "make" {
            fs::create_dir_all(invocation.cwd.join(".build").join("projects"))?;
            return Ok(());
        }

        let target = invocation.args.last().cloned().unwrap_or_default();
        if self.fail_target == Some(target.as_str()) {
            return Err(Error::ToolFailed {
                command: invocation.command_line(),
                code: Some(2),
            });
        }
        let bin = invocation.cwd.join(".build").join("linux64_gcc").join("bin");
        fs::create_dir_all(&bin)?;
        let file = if TOOL_NAMES.contains(&target.as_str()) {
            format!("{target}Release")
        } else {
            format!("lib{target}Release.a")
        };
        fs::write(bin.join(file), target)?;
        Ok(())
    }
}

fn config(root: &Path, library: Library, options: Options) -> RunConfig {
    RunConfig {
        library,
        revision: Revision::Latest,
        pins: BTreeMap::new(),
        settings: BuildSettings::native(
            Os::Linux,
            Compiler::new(CompilerFamily::Gcc, "13"),
            Arch::X86_64,
            BuildType::Release,
            options,
        )
        .with_host(Os::Linux, Arch::X86_64),
        toolchain: Toolchain::default(),
        work_dir: root.join("work"),
        package_dir: root.join("package"),
        archive_dir: Some(root.join("dist")),
        keep_sources: false,
    }
}

#[test]
fn test_full_bgfx_run() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let config = config(tmp.path(), Library::Bgfx, Options::TOOLS);

    let report = Orchestrator::new(&git, &tools).run(&config).unwrap();

    assert_eq!(report.version, Version::new(1, 86, 57));
    assert_eq!(report.versions[&Library::Bx], Version::new(1, 18, 20));
    assert_eq!(report.versions[&Library::Bimg], Version::new(1, 3, 30));
    assert_eq!(*git.clones.borrow(), vec!["bx", "bimg", "bgfx"]);
    assert!(git.checkouts.borrow().is_empty());

    // Generator first, then one make call per target.
    let calls = tools.calls.borrow();
    assert_eq!(calls.len(), 6);
    assert!(calls[0].program.ends_with("genie"));
    assert!(calls[0].args.contains(&"--with-tools".to_string()));
    let made: Vec<&str> = calls[1..]
        .iter()
        .map(|c| c.args.last().unwrap().as_str())
        .collect();
    assert_eq!(made, vec!["bgfx", "shaderc", "texturev", "geometryc", "geometryv"]);

    assert_eq!(report.package.libs, vec!["libbgfx.a"]);
    assert_eq!(
        report.package.bins,
        vec!["geometryc", "geometryv", "shaderc", "texturev"]
    );
    assert!(config.package_dir.join("include/bgfx/bgfx.h").exists());

    let archive = report.archive.unwrap();
    assert_eq!(
        archive.file_name().unwrap().to_string_lossy(),
        "bgfx-1.86.57-linux-x86_64-release-static.tar.gz"
    );
    assert!(archive.exists());
}

#[test]
fn test_tool_failure_stops_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools {
        fail_target: Some("shaderc"),
        ..FakeTools::default()
    };
    let config = config(tmp.path(), Library::Bgfx, Options::TOOLS);

    let err = Orchestrator::new(&git, &tools).run(&config).unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Build));
    assert!(err.to_string().starts_with("build phase failed"), "{err}");
    // texturev and later targets never ran.
    assert_eq!(tools.calls.borrow().len(), 3);
    assert!(!config.package_dir.exists());
}

#[test]
fn test_old_dependency_fails_validation() {
    let tmp = tempfile::tempdir().unwrap();
    // bx 1.17.0 is older than bimg needs.
    let git = FakeGit::new(1_700, 330, 8_657);
    let tools = FakeTools::default();
    let config = config(tmp.path(), Library::Bimg, Options::empty());

    let err = Orchestrator::new(&git, &tools).run(&config).unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Validate));
    assert!(tools.calls.borrow().is_empty());
}

#[test]
fn test_pinned_revisions_are_checked_out() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let mut config = config(tmp.path(), Library::Bgfx, Options::empty());
    config.revision = Revision::Exact(Version::new(1, 86, 50));
    config.pins.insert(Library::Bx, Revision::Exact(Version::new(1, 18, 0)));
    config.archive_dir = None;

    let report = Orchestrator::new(&git, &tools).run(&config).unwrap();

    assert_eq!(report.version, Version::new(1, 86, 50));
    assert_eq!(report.versions[&Library::Bx], Version::new(1, 18, 0));
    assert_eq!(
        *git.checkouts.borrow(),
        vec!["bx@master~20".to_string(), "bgfx@master~7".to_string()]
    );
    assert!(report.archive.is_none());
}

#[test]
fn test_kept_sources_are_reset_before_reuse() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let mut config = config(tmp.path(), Library::Bgfx, Options::empty());
    config.keep_sources = true;
    config.archive_dir = None;
    config.revision = Revision::Exact(Version::new(1, 86, 50));
    let orchestrator = Orchestrator::new(&git, &tools);
    orchestrator.run(&config).unwrap();
    assert_eq!(*git.checkouts.borrow(), vec!["bgfx@master~7".to_string()]);

    config.revision = Revision::Latest;
    let report = orchestrator.run(&config).unwrap();

    assert_eq!(report.version, Version::new(1, 86, 57));
    assert_eq!(git.clones.borrow().len(), 3);
    assert_eq!(
        *git.checkouts.borrow(),
        vec![
            "bgfx@master~7".to_string(),
            "bx@master".to_string(),
            "bimg@master".to_string(),
            "bgfx@master".to_string(),
        ]
    );
}

#[test]
fn test_plan_is_a_dry_run() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let config = config(tmp.path(), Library::Bx, Options::TOOLS);

    let plan = Orchestrator::new(&git, &tools).plan(&config).unwrap();

    assert!(plan.generator.args.contains(&"gmake".to_string()));
    assert_eq!(plan.targets, vec!["bx", "bin2c", "lemon"]);
    assert!(git.clones.borrow().is_empty());
    assert!(tools.calls.borrow().is_empty());
    assert!(!config.work_dir.exists());
}

#[test]
fn test_plan_rejects_unsupported_option() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let config = config(tmp.path(), Library::Bx, Options::SHARED);

    let err = Orchestrator::new(&git, &tools).plan(&config).unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Validate));
}

#[test]
fn test_package_existing_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let mut config = config(tmp.path(), Library::Bgfx, Options::empty());
    config.archive_dir = None;
    let orchestrator = Orchestrator::new(&git, &tools);
    orchestrator.run(&config).unwrap();

    config.package_dir = tmp.path().join("repackaged");
    config.archive_dir = Some(tmp.path().join("dist"));
    let (summary, archive) = orchestrator.package_existing(&config).unwrap();

    assert_eq!(summary.libs, vec!["libbgfx.a"]);
    let archive = archive.unwrap();
    assert!(
        archive
            .to_string_lossy()
            .ends_with("bgfx-1.86.57-linux-x86_64-release-static.tar.gz")
    );
    // Nothing was cloned or built a second time.
    assert_eq!(git.clones.borrow().len(), 3);
    assert_eq!(tools.calls.borrow().len(), 2);
}

#[test]
fn test_package_without_build_output() {
    let tmp = tempfile::tempdir().unwrap();
    let git = FakeGit::new(1_820, 330, 8_657);
    let tools = FakeTools::default();
    let mut config = config(tmp.path(), Library::Bgfx, Options::empty());
    config.revision = Revision::Exact(Version::new(1, 86, 57));

    let err = Orchestrator::new(&git, &tools)
        .package_existing(&config)
        .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Package));
}
