//! # bgfx-recipe
//!
//! Source builds and packaging for [bgfx](https://github.com/bkaradzic/bgfx)
//! and its companion libraries bx and bimg.
//!
//! A run maps declared build settings (OS, compiler, architecture, build type,
//! feature options) onto GENie and MSBuild/make invocations through static
//! tables, runs them, and collects the produced artifacts into a canonical
//! package layout with uniform file names.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgfx_recipe::{
//!     Arch, BuildSettings, BuildType, Compiler, CompilerFamily, GitCli, Library, Options,
//!     Orchestrator, Os, ProcessRunner, RunConfig, Toolchain,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = BuildSettings::native(
//!     Os::Linux,
//!     Compiler::new(CompilerFamily::Gcc, "13"),
//!     Arch::X86_64,
//!     BuildType::Release,
//!     Options::TOOLS,
//! );
//! let config = RunConfig {
//!     library: Library::Bgfx,
//!     revision: Default::default(),
//!     pins: Default::default(),
//!     settings,
//!     toolchain: Toolchain::default(),
//!     work_dir: "build".into(),
//!     package_dir: "package".into(),
//!     archive_dir: None,
//!     keep_sources: false,
//! };
//!
//! let report = Orchestrator::new(&GitCli::default(), &ProcessRunner).run(&config)?;
//! println!("packaged bgfx {}", report.version);
//! # Ok(())
//! # }
//! ```

pub use crate::{
    error::{Error, Phase, Result},
    invoke::{Invocation, ProcessRunner, ToolRunner, Wrapper},
    package::{ArtifactSet, PackageSummary},
    pipeline::{Orchestrator, RunConfig, RunReport},
    plan::{BuildPlan, BuildTool, Toolchain},
    recipe::{Library, Recipe},
    settings::{Arch, BuildSettings, BuildType, Compiler, CompilerFamily, Options, Os},
    source::{GitCli, SourceControl, SourceLayout},
    version::{Revision, Version},
};

// Core modules
pub mod error;
pub mod recipe;
pub mod settings;
pub mod version;

// Variant mapping
pub mod plan;
pub mod tables;
pub mod validate;

// External collaborators
pub mod invoke;
pub mod source;

// Output
pub mod archive;
pub mod package;

pub mod pipeline;
