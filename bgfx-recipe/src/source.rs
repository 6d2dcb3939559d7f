//! Source checkout of the bx, bimg and bgfx repositories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::recipe::Library;
use crate::version::{Revision, Version};

/// Branch whose commit count defines versions.
pub const MAIN_BRANCH: &str = "master";

/// Operations the fetcher needs from a source-control client.
pub trait SourceControl {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    fn commit_count(&self, repo: &Path, branch: &str) -> Result<u64>;
    fn checkout(&self, repo: &Path, rev: &str) -> Result<()>;
}

/// [`SourceControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git(&self, cwd: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null()).stderr(Stdio::inherit());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        debug!(program = %self.program.display(), ?args, "running git");

        let output = command.output().map_err(|e| {
            Error::source_control(format!("failed to run {}: {e}", self.program.display()))
        })?;
        if !output.status.success() {
            return Err(Error::source_control(format!(
                "`git {}` failed with {}",
                args.join(" "),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl SourceControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.git(None, &["clone", url, dest.as_ref()]).map(|_| ())
    }

    fn commit_count(&self, repo: &Path, branch: &str) -> Result<u64> {
        let out = self.git(Some(repo), &["rev-list", "--count", branch])?;
        out.parse::<u64>().map_err(|e| {
            Error::source_control(format!(
                "unexpected commit count `{out}` from {}: {e}",
                repo.display()
            ))
        })
    }

    fn checkout(&self, repo: &Path, rev: &str) -> Result<()> {
        self.git(Some(repo), &["checkout", "--detach", rev]).map(|_| ())
    }
}

/// Where each library's source tree lives under a work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub root: PathBuf,
}

impl SourceLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, library: Library) -> PathBuf {
        self.root.join(library.name())
    }
}

/// Check out every requested library at its revision.
///
/// Returns the version each tree ends up at. Existing trees are removed and
/// cloned again unless `keep_existing` is set, in which case they are reset to
/// the main branch first.
pub fn fetch<S: SourceControl + ?Sized>(
    scm: &S,
    layout: &SourceLayout,
    requests: &[(Library, Revision)],
    keep_existing: bool,
) -> Result<BTreeMap<Library, Version>> {
    fs::create_dir_all(&layout.root)?;
    let mut versions = BTreeMap::new();

    for &(library, revision) in requests {
        let dir = layout.dir(library);
        if keep_existing && dir.exists() {
            info!(%library, dir = %dir.display(), "reusing existing source tree");
            // An earlier run may have left HEAD detached at an older commit.
            scm.checkout(&dir, MAIN_BRANCH)?;
        } else {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            info!(%library, url = %library.repository(), "cloning");
            scm.clone_repo(&library.repository(), &dir)?;
        }

        let count = scm.commit_count(&dir, MAIN_BRANCH)?;
        let version = match revision {
            Revision::Latest => Version::from_commit_count(count),
            Revision::Exact(wanted) => {
                let wanted_count = wanted.commit_count()?;
                let offset = count.checked_sub(wanted_count).ok_or_else(|| {
                    Error::source_control(format!(
                        "{library} {wanted} is newer than the repository ({})",
                        Version::from_commit_count(count)
                    ))
                })?;
                if offset > 0 {
                    scm.checkout(&dir, &format!("{MAIN_BRANCH}~{offset}"))?;
                }
                info!(%library, version = %wanted, offset, "checked out");
                wanted
            }
        };
        versions.insert(library, version);
    }

    Ok(versions)
}
