//! Configuration checks run before anything touches the filesystem.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::recipe::{Library, Recipe};
use crate::settings::{Arch, BuildSettings, Os};
use crate::version::Version;

pub const MIN_CPPSTD: u32 = 14;

/// Older bimg bundles an astc encoder that does not build for 32-bit Linux.
const BIMG_X86_CROSS_MIN: Version = Version::new(1, 3, 30);

pub fn settings(settings: &BuildSettings, recipe: &Recipe) -> Result<()> {
    if let Some(cppstd) = settings.cppstd {
        if cppstd < MIN_CPPSTD {
            return Err(Error::configuration(format!(
                "{} requires at least C++{MIN_CPPSTD}, got C++{cppstd}",
                recipe.name()
            )));
        }
    }

    let unsupported = settings.options.difference(recipe.supported);
    if !unsupported.is_empty() {
        let names: Vec<&str> = unsupported.iter_names().map(|(name, _)| name).collect();
        return Err(Error::configuration(format!(
            "{} does not support option(s): {}",
            recipe.name(),
            names.join(", ")
        )));
    }

    Ok(())
}

/// Checks that need the versions of the checked out sources.
pub fn versions(
    settings: &BuildSettings,
    recipe: &Recipe,
    versions: &BTreeMap<Library, Version>,
) -> Result<()> {
    for requirement in recipe.requires {
        if let Some(found) = versions.get(&requirement.library) {
            if *found < requirement.min {
                return Err(Error::configuration(format!(
                    "{} requires {} >= {}, found {found}",
                    recipe.name(),
                    requirement.library,
                    requirement.min
                )));
            }
        }
    }

    // Only a 32-bit target built on a 64-bit host is rejected; a native x86
    // host or an x86_64 target is left alone.
    if let Some(bimg) = versions.get(&Library::Bimg) {
        if *bimg < BIMG_X86_CROSS_MIN
            && matches!(settings.os, Os::Linux | Os::FreeBSD)
            && settings.arch == Arch::X86
            && settings.host_arch == Arch::X86_64
        {
            return Err(Error::configuration(format!(
                "bimg {bimg} cannot be cross-built to Linux x86; use bimg >= {BIMG_X86_CROSS_MIN}"
            )));
        }
    }

    Ok(())
}
