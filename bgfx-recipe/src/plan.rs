//! Variant mapping: build settings to a concrete build plan.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::invoke::{Invocation, Wrapper};
use crate::recipe::{Library, Recipe};
use crate::settings::{Arch, BuildSettings, Options, Os};
use crate::source::SourceLayout;
use crate::tables;

/// Locations of the external toolchain pieces a plan may need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Android NDK root, required for Android targets.
    pub android_ndk: Option<PathBuf>,
    /// POSIX emulation shell used for MinGW builds on Windows.
    pub posix_shell: PathBuf,
    /// `vcvarsall.bat` to call before MSBuild; MSBuild is assumed on `PATH` otherwise.
    pub vcvars: Option<PathBuf>,
    /// Parallel make jobs.
    pub jobs: Option<usize>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            android_ndk: None,
            posix_shell: PathBuf::from("bash"),
            vcvars: None,
            jobs: None,
        }
    }
}

/// Which native build tool a plan drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTool {
    MsBuild,
    Make,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub tool: BuildTool,
    pub generator: Invocation,
    pub builds: Vec<Invocation>,
    /// Build targets as the build tool names them.
    pub targets: Vec<String>,
    /// Directory the generator writes the project files to.
    pub project_dir: PathBuf,
    /// Things the caller must provide that this crate does not install.
    pub warnings: Vec<String>,
}

impl BuildPlan {
    pub fn generator_command_line(&self) -> String {
        self.generator.command_line()
    }
}

/// GENie flags for the feature options of a recipe.
pub fn genie_flags(options: Options) -> Vec<String> {
    let mut flags = Vec::new();
    if options.shared() {
        flags.push("--with-shared-lib".to_string());
    }
    if options.tools() {
        flags.push("--with-tools".to_string());
    }
    if options.contains(Options::PROFILER) {
        flags.push("--with-profiler".to_string());
    }
    if options.contains(Options::RTTI) {
        flags.push("--with-rtti".to_string());
    }
    flags
}

/// Map settings onto the generator and build-tool invocations for `recipe`.
///
/// Pure table lookups; any combination without a table entry is an
/// [`Error::Unsupported`].
pub fn resolve(
    settings: &BuildSettings,
    recipe: &Recipe,
    layout: &SourceLayout,
    toolchain: &Toolchain,
) -> Result<BuildPlan> {
    let source_dir = layout.dir(recipe.library);
    let genie = layout
        .dir(Library::Bx)
        .join("tools")
        .join("bin")
        .join(tables::genie_bin_folder(settings.host_os)?)
        .join(tables::genie_executable(settings.host_os));
    let genie = genie.to_string_lossy().into_owned();

    let mut env = Vec::new();
    if settings.os == Os::Android {
        let ndk = toolchain.android_ndk.as_ref().ok_or_else(|| {
            Error::configuration("Android builds need an NDK; set ANDROID_NDK_ROOT or `android_ndk`")
        })?;
        env.push(("ANDROID_NDK_ROOT".to_string(), ndk.to_string_lossy().into_owned()));
    }

    let mut flags = genie_flags(settings.options);
    let mut warnings = Vec::new();
    let targets = recipe.targets(settings.options);

    if settings.compiler.is_msvc() {
        if settings.os != Os::Windows {
            return Err(Error::unsupported("os for msvc", settings.os));
        }
        let action = format!("vs{}", tables::vs_generator(&settings.compiler.version)?);
        flags.push(action.clone());

        let project_dir = source_dir.join(".build").join("projects").join(&action);
        let solution = project_dir.join(format!("{}.sln", recipe.name()));
        let targets: Vec<String> = targets.iter().map(|t| t.msbuild.to_string()).collect();

        let mut msbuild = Invocation::new("msbuild", &source_dir)
            .arg(solution.to_string_lossy())
            .arg(format!(
                "/p:Configuration={}",
                tables::msbuild_configuration(settings.build_type)
            ))
            .arg(format!("/p:Platform={}", tables::msbuild_platform(settings.arch)))
            .arg(format!("/target:{}", targets.join(";")))
            .arg("/m");
        if let Some(script) = &toolchain.vcvars {
            msbuild = msbuild.wrapper(Wrapper::VcVars {
                script: script.clone(),
                arch: tables::vcvars_arch(settings.arch),
            });
        }

        return Ok(BuildPlan {
            tool: BuildTool::MsBuild,
            generator: with_env(Invocation::new(genie, &source_dir).args(flags), &env),
            builds: vec![with_env(msbuild, &env)],
            targets,
            project_dir,
            warnings,
        });
    }

    let dialect = tables::gcc_dialect(settings.os, settings.compiler.family)?;
    let suffix = if tables::uses_arch_folder_suffix(settings.os) {
        tables::arch_folder_suffix(settings.os, settings.arch)?
    } else {
        ""
    };
    flags.push(format!("--gcc={}{suffix}", dialect.flag));
    flags.push("gmake".to_string());

    let project_dir = source_dir
        .join(".build")
        .join("projects")
        .join(format!("gmake-{}{suffix}", dialect.folder));

    let mut config = tables::make_config(settings.build_type)?.to_string();
    if tables::uses_make_config_suffix(settings.os) {
        config.push_str(tables::make_config_suffix(settings.arch)?);
    }

    if matches!(settings.os, Os::Linux | Os::FreeBSD)
        && settings.arch == Arch::X86
        && settings.host_arch == Arch::X86_64
    {
        warnings.push(
            "32-bit build on a 64-bit host needs gcc-multilib and g++-multilib installed".to_string(),
        );
    }

    let wrapper = if settings.os == Os::Windows {
        Wrapper::PosixShell(toolchain.posix_shell.clone())
    } else {
        Wrapper::Direct
    };

    let builds = targets
        .iter()
        .map(|target| {
            let mut make = Invocation::new("make", &source_dir)
                .arg("-R")
                .arg("-C")
                .arg(project_dir.to_string_lossy())
                .arg(config.as_str());
            if let Some(jobs) = toolchain.jobs {
                make = make.arg(format!("-j{jobs}"));
            }
            with_env(make.arg(target.make).wrapper(wrapper.clone()), &env)
        })
        .collect();

    Ok(BuildPlan {
        tool: BuildTool::Make,
        generator: with_env(
            Invocation::new(genie, &source_dir).args(flags).wrapper(wrapper),
            &env,
        ),
        builds,
        targets: targets.iter().map(|t| t.make.to_string()).collect(),
        project_dir,
        warnings,
    })
}

fn with_env(invocation: Invocation, env: &[(String, String)]) -> Invocation {
    env.iter()
        .fold(invocation, |inv, (key, value)| inv.env(key.as_str(), value.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::BGFX;
    use crate::settings::{BuildType, Compiler, CompilerFamily};

    fn linux_gcc(arch: Arch) -> BuildSettings {
        BuildSettings::native(
            Os::Linux,
            Compiler::new(CompilerFamily::Gcc, "13"),
            arch,
            BuildType::Release,
            Options::empty(),
        )
        .with_host(Os::Linux, Arch::X86_64)
    }

    #[test]
    fn test_linux_make_plan() {
        let layout = SourceLayout::new("/work");
        let plan = resolve(&linux_gcc(Arch::X86_64), &BGFX, &layout, &Toolchain::default()).unwrap();

        assert_eq!(plan.tool, BuildTool::Make);
        assert_eq!(
            plan.generator_command_line(),
            "/work/bx/tools/bin/linux/genie --gcc=linux-gcc gmake"
        );
        assert_eq!(
            plan.project_dir,
            PathBuf::from("/work/bgfx/.build/projects/gmake-linux")
        );
        assert_eq!(plan.builds.len(), 1);
        assert_eq!(
            plan.builds[0].args,
            vec![
                "-R",
                "-C",
                "/work/bgfx/.build/projects/gmake-linux",
                "config=release64",
                "bgfx"
            ]
        );
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_multilib_is_flagged() {
        let plan = resolve(
            &linux_gcc(Arch::X86),
            &BGFX,
            &SourceLayout::new("/work"),
            &Toolchain::default(),
        )
        .unwrap();
        assert_eq!(plan.builds[0].args[3], "config=release32");
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("multilib"));
    }

    #[test]
    fn test_genie_flags() {
        assert!(genie_flags(Options::empty()).is_empty());
        assert_eq!(
            genie_flags(Options::SHARED | Options::TOOLS),
            vec!["--with-shared-lib", "--with-tools"]
        );
    }
}
