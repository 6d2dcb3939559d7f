//! External tool invocation: the project generator and the native build tool.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::plan::BuildPlan;

/// How a command line reaches the operating system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Wrapper {
    /// Run the program directly.
    #[default]
    Direct,
    /// Run through a POSIX emulation shell (`<shell> -lc "<command line>"`).
    PosixShell(PathBuf),
    /// Run from `cmd` after calling a Visual Studio `vcvarsall.bat`.
    VcVars { script: PathBuf, arch: &'static str },
}

/// One external command: program, arguments, working directory and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub wrapper: Wrapper,
}

impl Invocation {
    pub fn new<P: Into<String>, C: Into<PathBuf>>(program: P, cwd: C) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            wrapper: Wrapper::Direct,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Program and arguments as a single printable command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The invocation as a line for a POSIX shell: every word single-quoted, run
/// from `cwd`. Backslashes in Windows paths stay literal.
pub fn posix_command_line(invocation: &Invocation) -> String {
    let cwd = invocation.cwd.to_string_lossy();
    let words: Vec<String> = std::iter::once(invocation.program.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .map(posix_quote)
        .collect();
    format!("cd {} && {}", posix_quote(&cwd), words.join(" "))
}

fn posix_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', "'\\''"))
}

fn quote(word: &str) -> String {
    if word.is_empty() || word.contains(char::is_whitespace) {
        format!("\"{word}\"")
    } else {
        word.to_string()
    }
}

/// Runs invocations; the seam between plans and real processes.
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// [`ToolRunner`] that spawns processes and waits for them, with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        let line = invocation.command_line();
        let mut command = match &invocation.wrapper {
            Wrapper::Direct => {
                let mut command = Command::new(&invocation.program);
                command.args(&invocation.args);
                command
            }
            Wrapper::PosixShell(shell) => {
                let mut command = Command::new(shell);
                // Keeps the MSYS2 login profile from changing to $HOME.
                command
                    .arg("-lc")
                    .arg(posix_command_line(invocation))
                    .env("CHERE_INVOKING", "1");
                command
            }
            Wrapper::VcVars { script, arch } => {
                let mut command = Command::new("cmd");
                command
                    .arg("/C")
                    .arg(format!("call \"{}\" {arch} && {line}", script.display()));
                command
            }
        };
        command
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)));

        info!(cwd = %invocation.cwd.display(), "running {line}");
        let status = command.status().map_err(|e| {
            error!("could not start `{line}`: {e}");
            Error::Io(e)
        })?;
        if !status.success() {
            return Err(Error::ToolFailed {
                command: line,
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Run the generator of a plan.
pub fn generate<R: ToolRunner + ?Sized>(runner: &R, plan: &BuildPlan) -> Result<()> {
    for warning in &plan.warnings {
        warn!("{warning}");
    }
    runner.run(&plan.generator)
}

/// Run every build-tool invocation of a plan, in order.
pub fn build<R: ToolRunner + ?Sized>(runner: &R, plan: &BuildPlan) -> Result<()> {
    for invocation in &plan.builds {
        runner.run(invocation)?;
    }
    Ok(())
}

/// Directory holding compiled artifacts of a source tree.
///
/// GENie writes them to `.build/<platform dir>/bin`, where the platform
/// directory is the first entry under `.build` other than `projects`.
pub fn locate_build_output(source_dir: &Path) -> Result<PathBuf> {
    let build_root = source_dir.join(".build");
    let read = fs::read_dir(&build_root).map_err(|e| {
        Error::package(format!(
            "build directory {} is not readable: {e}",
            build_root.display()
        ))
    })?;

    let mut candidates: Vec<PathBuf> = read
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_dir() && p.file_name().is_some_and(|n| n != "projects"))
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .map(|dir| dir.join("bin"))
        .ok_or_else(|| {
            Error::package(format!(
                "no build output directory under {}",
                build_root.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_spaces() {
        let inv = Invocation::new("make", "/src")
            .args(["-R", "-C", "/path with space/proj"])
            .arg("config=release64");
        assert_eq!(
            inv.command_line(),
            "make -R -C \"/path with space/proj\" config=release64"
        );
    }

    #[test]
    fn test_posix_command_line_keeps_backslashes() {
        let inv = Invocation::new("C:\\work\\bx\\genie.exe", "C:\\work\\bgfx")
            .args(["--gcc=mingw-gcc", "it's"]);
        assert_eq!(
            posix_command_line(&inv),
            "cd 'C:\\work\\bgfx' && 'C:\\work\\bx\\genie.exe' '--gcc=mingw-gcc' 'it'\\''s'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_posix_shell_runs_in_cwd_with_literal_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let odd = tmp.path().join("a\\b");
        fs::create_dir_all(&odd).unwrap();
        fs::write(tmp.path().join("marker"), b"").unwrap();
        let shell = Wrapper::PosixShell(PathBuf::from("bash"));

        let inv = Invocation::new("test", tmp.path())
            .args(["-d".to_string(), odd.to_string_lossy().into_owned()])
            .wrapper(shell.clone());
        ProcessRunner.run(&inv).unwrap();

        // Relative paths resolve against the invocation's directory.
        let inv = Invocation::new("test", tmp.path())
            .args(["-f", "marker"])
            .wrapper(shell.clone());
        ProcessRunner.run(&inv).unwrap();

        let inv = Invocation::new("test", tmp.path())
            .args(["-f", "missing"])
            .wrapper(shell);
        assert!(matches!(
            ProcessRunner.run(&inv),
            Err(Error::ToolFailed { code: Some(1), .. })
        ));
    }

    #[test]
    fn test_locate_build_output_skips_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let build = tmp.path().join(".build");
        fs::create_dir_all(build.join("projects").join("gmake-linux")).unwrap();
        fs::create_dir_all(build.join("linux64_gcc").join("bin")).unwrap();

        let out = locate_build_output(tmp.path()).unwrap();
        assert_eq!(out, build.join("linux64_gcc").join("bin"));
    }

    #[test]
    fn test_locate_build_output_without_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".build").join("projects")).unwrap();
        assert!(matches!(
            locate_build_output(tmp.path()),
            Err(Error::Package { .. })
        ));
    }
}
