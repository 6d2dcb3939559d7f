//! Per-library recipe descriptions for bx, bimg and bgfx.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::settings::{Options, Os};
use crate::version::Version;

/// One of the three libraries this crate knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    Bx,
    Bimg,
    Bgfx,
}

impl Library {
    pub const ALL: [Library; 3] = [Library::Bx, Library::Bimg, Library::Bgfx];

    pub fn name(&self) -> &'static str {
        match self {
            Library::Bx => "bx",
            Library::Bimg => "bimg",
            Library::Bgfx => "bgfx",
        }
    }

    pub fn repository(&self) -> String {
        format!("https://github.com/bkaradzic/{}.git", self.name())
    }

    pub fn recipe(&self) -> &'static Recipe {
        match self {
            Library::Bx => &BX,
            Library::Bimg => &BIMG,
            Library::Bgfx => &BGFX,
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Library {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Library::ALL
            .into_iter()
            .find(|lib| lib.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::configuration(format!("unknown library `{s}`")))
    }
}

/// A build target, named as make and as the Visual Studio solution see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub make: &'static str,
    pub msbuild: &'static str,
}

impl Target {
    const fn new(make: &'static str, msbuild: &'static str) -> Self {
        Self { make, msbuild }
    }
}

/// A command line tool built with `--with-tools`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    pub name: &'static str,
    pub target: Target,
}

/// Minimum version of another library this one builds against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub library: Library,
    pub min: Version,
}

#[derive(Debug)]
pub struct Recipe {
    pub library: Library,
    pub license: &'static str,
    pub description: &'static str,
    pub requires: &'static [Requirement],
    pub static_targets: &'static [Target],
    pub shared_targets: &'static [Target],
    pub tools: &'static [Tool],
    /// Canonical library names, most specific first; also the rename rules.
    pub lib_names: &'static [&'static str],
    pub expected_libs: usize,
    /// Substrings of byproduct files removed from `lib/`.
    pub denylist: &'static [&'static str],
    pub supported: Options,
    /// Linked by consumers on Linux and FreeBSD.
    pub unix_system_libs: &'static [&'static str],
}

impl Recipe {
    pub fn name(&self) -> &'static str {
        self.library.name()
    }

    /// Sources that must be checked out side by side, the built library last.
    pub fn sources(&self) -> Vec<Library> {
        let mut sources: Vec<Library> = self.requires.iter().map(|r| r.library).collect();
        if !sources.contains(&Library::Bx) && self.library != Library::Bx {
            sources.insert(0, Library::Bx);
        }
        sources.push(self.library);
        sources
    }

    pub fn library_targets(&self, options: Options) -> &'static [Target] {
        if options.shared() {
            self.shared_targets
        } else {
            self.static_targets
        }
    }

    /// Library targets followed by the tool targets when tools are enabled.
    pub fn targets(&self, options: Options) -> Vec<Target> {
        let mut targets = self.library_targets(options).to_vec();
        if options.tools() {
            targets.extend(self.tools.iter().map(|t| t.target));
        }
        targets
    }

    pub fn system_libs(&self, os: Os) -> &'static [&'static str] {
        match os {
            Os::Linux | Os::FreeBSD => self.unix_system_libs,
            _ => &[],
        }
    }

    pub fn is_denylisted(&self, file_name: &str) -> bool {
        self.denylist.iter().any(|word| file_name.contains(word))
    }
}

pub static BX: Recipe = Recipe {
    library: Library::Bx,
    license: "BSD-2-Clause",
    description: "Base library providing utility functions and macros.",
    requires: &[],
    static_targets: &[Target::new("bx", "bx")],
    shared_targets: &[],
    tools: &[
        Tool {
            name: "bin2c",
            target: Target::new("bin2c", "bin2c"),
        },
        Tool {
            name: "lemon",
            target: Target::new("lemon", "lemon"),
        },
    ],
    lib_names: &["bx"],
    expected_libs: 1,
    denylist: &["bin2c", "lemon", "example"],
    supported: Options::TOOLS.union(Options::RTTI),
    unix_system_libs: &["dl", "pthread"],
};

pub static BIMG: Recipe = Recipe {
    library: Library::Bimg,
    license: "BSD-2-Clause",
    description: "Image library providing loading, saving, conversions and other utilities.",
    requires: &[Requirement {
        library: Library::Bx,
        min: Version::new(1, 18, 0),
    }],
    static_targets: &[
        Target::new("bimg", "bimg"),
        Target::new("bimg_decode", "bimg_decode"),
        Target::new("bimg_encode", "bimg_encode"),
    ],
    shared_targets: &[],
    tools: &[Tool {
        name: "texturec",
        target: Target::new("texturec", "texturec"),
    }],
    lib_names: &["bimg_decode", "bimg_encode", "bimg"],
    expected_libs: 3,
    denylist: &["bx", "texturec", "example"],
    supported: Options::TOOLS.union(Options::RTTI),
    unix_system_libs: &[],
};

pub static BGFX: Recipe = Recipe {
    library: Library::Bgfx,
    license: "BSD-2-Clause",
    description: "Cross-platform, graphics API agnostic, \"Bring Your Own Engine/Framework\" style rendering library.",
    requires: &[
        Requirement {
            library: Library::Bx,
            min: Version::new(1, 18, 0),
        },
        Requirement {
            library: Library::Bimg,
            min: Version::new(1, 3, 0),
        },
    ],
    static_targets: &[Target::new("bgfx", "libs\\bgfx")],
    shared_targets: &[Target::new("bgfx-shared-lib", "libs\\bgfx-shared-lib")],
    tools: &[
        Tool {
            name: "shaderc",
            target: Target::new("shaderc", "tools\\shaderc\\shaderc"),
        },
        Tool {
            name: "texturev",
            target: Target::new("texturev", "tools\\texturev"),
        },
        Tool {
            name: "geometryc",
            target: Target::new("geometryc", "tools\\geometryc"),
        },
        Tool {
            name: "geometryv",
            target: Target::new("geometryv", "tools\\geometryv"),
        },
    ],
    lib_names: &["bgfx"],
    expected_libs: 1,
    denylist: &[
        "bx",
        "bimg",
        "shaderc",
        "texturev",
        "geometryc",
        "geometryv",
        "example",
        "fcpp",
        "glsl",
        "spirv",
    ],
    supported: Options::all(),
    unix_system_libs: &["X11", "GL"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_end_with_library() {
        assert_eq!(BGFX.sources(), vec![Library::Bx, Library::Bimg, Library::Bgfx]);
        assert_eq!(BIMG.sources(), vec![Library::Bx, Library::Bimg]);
        assert_eq!(BX.sources(), vec![Library::Bx]);
    }

    #[test]
    fn test_targets_follow_options() {
        let static_only = BGFX.targets(Options::empty());
        assert_eq!(static_only, vec![Target::new("bgfx", "libs\\bgfx")]);

        let shared_tools = BGFX.targets(Options::SHARED | Options::TOOLS);
        assert_eq!(shared_tools.len(), 5);
        assert_eq!(shared_tools[0].make, "bgfx-shared-lib");
        assert_eq!(shared_tools[1].msbuild, "tools\\shaderc\\shaderc");
    }

    #[test]
    fn test_denylist_keeps_own_library() {
        assert!(!BGFX.is_denylisted("bgfxRelease.lib"));
        assert!(BGFX.is_denylisted("bxRelease.lib"));
        assert!(BGFX.is_denylisted("libspirv-crossRelease.a"));
        assert!(!BIMG.is_denylisted("bimg_decodeRelease.lib"));
    }

    #[test]
    fn test_library_parse() {
        assert_eq!("BGFX".parse::<Library>().unwrap(), Library::Bgfx);
        assert!("glfw".parse::<Library>().is_err());
    }

    #[test]
    fn test_system_libs() {
        assert_eq!(BGFX.system_libs(Os::Linux), &["X11", "GL"]);
        assert!(BGFX.system_libs(Os::Windows).is_empty());
    }
}
