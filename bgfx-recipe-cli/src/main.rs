use std::path::PathBuf;

use anyhow::Result;
use bgfx_recipe::source::MAIN_BRANCH;
use bgfx_recipe::{
    Arch, BuildPlan, BuildType, CompilerFamily, GitCli, Library, Orchestrator, Os, ProcessRunner,
    Revision, RunConfig, Version, version,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;

use config::{Overrides, RecipeConfig};

/// bgfx-recipe - build and package bgfx, bimg and bx from source
#[derive(Parser)]
#[command(name = "bgfx-recipe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: bgfx-recipe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generator and build commands without running anything
    Plan {
        #[command(flatten)]
        variant: VariantArgs,
    },

    /// Compute a version from a repository or a raw commit count
    Version {
        /// Repository to count the main branch commits of
        #[arg(long, conflicts_with = "commits", required_unless_present = "commits")]
        repo: Option<PathBuf>,

        /// Commit count to convert
        #[arg(long)]
        commits: Option<u64>,

        /// Branch to count
        #[arg(long, default_value = MAIN_BRANCH)]
        branch: String,
    },

    /// Fetch sources, build and package
    Build {
        #[command(flatten)]
        variant: VariantArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Reuse source trees from an earlier run instead of cloning again
        #[arg(long)]
        keep_sources: bool,
    },

    /// Package an already built source tree
    Package {
        #[command(flatten)]
        variant: VariantArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct VariantArgs {
    /// Library to build (bx, bimg, bgfx)
    #[arg(short, long)]
    library: Option<Library>,

    /// `latest` or an exact version such as 1.128.8786
    #[arg(long)]
    revision: Option<Revision>,

    /// Target operating system
    #[arg(long)]
    os: Option<Os>,

    /// Target architecture
    #[arg(long)]
    arch: Option<Arch>,

    /// Compiler family (msvc, gcc, clang, apple-clang)
    #[arg(long)]
    compiler: Option<CompilerFamily>,

    /// Compiler version; selects the Visual Studio generation for msvc
    #[arg(long)]
    compiler_version: Option<String>,

    /// Debug or Release
    #[arg(long)]
    build_type: Option<BuildType>,

    /// Build the shared library
    #[arg(long)]
    shared: bool,

    /// Also build the command line tools
    #[arg(long)]
    tools: bool,

    /// Parallel make jobs
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Directory holding the source checkouts
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

#[derive(Args, Default)]
struct OutputArgs {
    /// Package output directory
    #[arg(short, long)]
    package_dir: Option<PathBuf>,

    /// Also write a .tar.gz of the package into this directory
    #[arg(long)]
    archive: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match cli.command {
        Commands::Plan { variant } => {
            let run = run_config(cli.config, &variant, &OutputArgs::default(), false)?;
            cmd_plan(&run)
        }
        Commands::Version {
            repo,
            commits,
            branch,
        } => cmd_version(repo, commits, &branch),
        Commands::Build {
            variant,
            output,
            keep_sources,
        } => {
            let run = run_config(cli.config, &variant, &output, keep_sources)?;
            cmd_build(&run)
        }
        Commands::Package { variant, output } => {
            let run = run_config(cli.config, &variant, &output, false)?;
            cmd_package(&run)
        }
    }
}

fn run_config(
    file: Option<PathBuf>,
    variant: &VariantArgs,
    output: &OutputArgs,
    keep_sources: bool,
) -> Result<RunConfig> {
    let config = RecipeConfig::load(file.as_deref())?;
    let overrides = Overrides {
        library: variant.library,
        revision: variant.revision,
        os: variant.os,
        arch: variant.arch,
        compiler: variant.compiler,
        compiler_version: variant.compiler_version.clone(),
        build_type: variant.build_type,
        shared: variant.shared,
        tools: variant.tools,
        work_dir: variant.work_dir.clone(),
        package_dir: output.package_dir.clone(),
        archive_dir: output.archive.clone(),
        jobs: variant.jobs,
        keep_sources,
    };
    config.to_run_config(&overrides, |key| std::env::var(key).ok())
}

fn cmd_plan(run: &RunConfig) -> Result<()> {
    let git = GitCli::default();
    let plan = Orchestrator::new(&git, &ProcessRunner).plan(run)?;
    print_plan(run, &plan);
    Ok(())
}

fn print_plan(run: &RunConfig, plan: &BuildPlan) {
    println!("library:   {} ({})", run.library, run.revision);
    println!("variant:   {}", run.settings.describe());
    println!("sources:   {}", run.layout().root.display());
    println!("projects:  {}", plan.project_dir.display());
    println!("generate:  {}", plan.generator_command_line());
    for build in &plan.builds {
        println!("build:     {}", build.command_line());
    }
    for warning in &plan.warnings {
        println!("warning:   {warning}");
    }
}

fn cmd_version(repo: Option<PathBuf>, commits: Option<u64>, branch: &str) -> Result<()> {
    let version = match (repo, commits) {
        (_, Some(count)) => Version::from_commit_count(count),
        (Some(repo), None) => version::resolve(&GitCli::default(), &repo, branch)?,
        (None, None) => anyhow::bail!("either --repo or --commits is required"),
    };
    println!("{version}");
    Ok(())
}

fn cmd_build(run: &RunConfig) -> Result<()> {
    let git = GitCli::default();
    let report = Orchestrator::new(&git, &ProcessRunner).run(run)?;

    println!("{} {}", run.library, report.version);
    for (library, version) in &report.versions {
        if *library != run.library {
            println!("  with {library} {version}");
        }
    }
    println!("package:   {}", report.package.package_dir.display());
    println!("libs:      {}", report.package.libs.join(", "));
    if !report.package.bins.is_empty() {
        println!("bins:      {}", report.package.bins.join(", "));
    }
    if let Some(archive) = &report.archive {
        println!("archive:   {}", archive.display());
    }
    Ok(())
}

fn cmd_package(run: &RunConfig) -> Result<()> {
    let git = GitCli::default();
    let (summary, archive) = Orchestrator::new(&git, &ProcessRunner).package_existing(run)?;

    println!("package:   {}", summary.package_dir.display());
    println!("libs:      {}", summary.libs.join(", "));
    if let Some(archive) = archive {
        println!("archive:   {}", archive.display());
    }
    Ok(())
}
