//! Compress a finished package directory into a `.tar.gz`.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::{Compression, write::GzEncoder};
use tracing::info;

use crate::error::{Error, Result};
use crate::package::link_type;
use crate::recipe::Recipe;
use crate::settings::BuildSettings;
use crate::version::Version;

/// `<name>-<version>-<os>-<arch>-<build type>-<static|shared>.tar.gz`
pub fn archive_name(recipe: &Recipe, version: Version, settings: &BuildSettings) -> String {
    format!(
        "{}-{}-{}-{}-{}-{}.tar.gz",
        recipe.name(),
        version,
        settings.os.to_string().to_ascii_lowercase(),
        settings.arch,
        settings.build_type.to_string().to_ascii_lowercase(),
        link_type(settings)
    )
}

/// Write `package_dir` as `dest_dir/file_name`, entries relative to the package root.
pub fn create(package_dir: &Path, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
    if !package_dir.join("lib").exists() {
        return Err(Error::package(format!(
            "{} has no lib/ directory; refusing to archive an incomplete package",
            package_dir.display()
        )));
    }

    fs::create_dir_all(dest_dir)?;
    let path = dest_dir.join(file_name);
    let tar_file = fs::File::create(&path)?;
    let mut archive = tar::Builder::new(GzEncoder::new(tar_file, Compression::best()));

    append_dir_all_files(&mut archive, package_dir, PathBuf::new())?;

    archive.into_inner()?.finish()?;
    info!(archive = %path.display(), "archive created");
    Ok(path)
}

fn append_dir_all_files(
    archive: &mut tar::Builder<GzEncoder<fs::File>>,
    src: &Path,
    dst: PathBuf,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(src)?.flatten().map(|e| e.path()).collect();
    entries.sort();
    for p in entries {
        let Some(name) = p.file_name() else {
            continue;
        };
        let dst_path = dst.join(name);
        if p.is_dir() {
            append_dir_all_files(archive, &p, dst_path)?;
        } else {
            archive.append_path_with_name(&p, &dst_path)?;
        }
    }
    Ok(())
}
