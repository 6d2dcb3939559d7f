//! Build settings: the immutable input tuple of a recipe run

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Operating system a package is built for (or built on)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Os {
    Windows,
    Linux,
    FreeBSD,
    Macos,
    Android,
    #[serde(rename = "iOS")]
    Ios,
}

impl Os {
    /// Operating system of the running machine, if it is one we know
    pub fn host() -> Option<Os> {
        match std::env::consts::OS {
            "windows" => Some(Os::Windows),
            "linux" => Some(Os::Linux),
            "freebsd" => Some(Os::FreeBSD),
            "macos" => Some(Os::Macos),
            _ => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Os::Windows => "Windows",
            Os::Linux => "Linux",
            Os::FreeBSD => "FreeBSD",
            Os::Macos => "Macos",
            Os::Android => "Android",
            Os::Ios => "iOS",
        })
    }
}

impl FromStr for Os {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(Os::Windows),
            "linux" => Ok(Os::Linux),
            "freebsd" => Ok(Os::FreeBSD),
            "macos" | "darwin" | "osx" => Ok(Os::Macos),
            "android" => Ok(Os::Android),
            "ios" => Ok(Os::Ios),
            _ => Err(Error::configuration(format!("unknown operating system `{s}`"))),
        }
    }
}

/// CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    /// Architecture of the running machine, if it is one we know
    pub fn host() -> Option<Arch> {
        match std::env::consts::ARCH {
            "x86" => Some(Arch::X86),
            "x86_64" => Some(Arch::X86_64),
            "arm" => Some(Arch::Armv7),
            "aarch64" => Some(Arch::Armv8),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
        })
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i686" => Ok(Arch::X86),
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "armv7" | "arm" => Ok(Arch::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Arch::Armv8),
            _ => Err(Error::configuration(format!("unknown architecture `{s}`"))),
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum BuildType {
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        })
    }
}

impl FromStr for BuildType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(Error::configuration(format!("unknown build type `{s}`"))),
        }
    }
}

/// Compiler family; selects the generator dialect and the build tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CompilerFamily {
    #[serde(rename = "msvc", alias = "Visual Studio")]
    Msvc,
    #[serde(rename = "gcc")]
    Gcc,
    #[serde(rename = "clang")]
    Clang,
    #[serde(rename = "apple-clang")]
    AppleClang,
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompilerFamily::Msvc => "msvc",
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
        })
    }
}

impl FromStr for CompilerFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "msvc" | "visual studio" => Ok(CompilerFamily::Msvc),
            "gcc" => Ok(CompilerFamily::Gcc),
            "clang" => Ok(CompilerFamily::Clang),
            "apple-clang" => Ok(CompilerFamily::AppleClang),
            _ => Err(Error::configuration(format!("unknown compiler `{s}`"))),
        }
    }
}

/// Compiler identity and version (e.g. msvc 193, gcc 13)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Compiler {
    pub family: CompilerFamily,
    pub version: String,
}

impl Compiler {
    pub fn new<S: Into<String>>(family: CompilerFamily, version: S) -> Self {
        Self {
            family,
            version: version.into(),
        }
    }

    /// Whether this compiler builds through Visual Studio solutions and MSBuild
    pub fn is_msvc(&self) -> bool {
        self.family == CompilerFamily::Msvc
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.version)
    }
}

bitflags! {
    /// Feature options of a package
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Options: u32 {
        /// Build the shared library variant instead of the static one.
        const SHARED = 1 << 0;
        /// Also build and package the command line tools.
        const TOOLS = 1 << 1;
        /// Build with runtime type information.
        const RTTI = 1 << 2;
        /// Build with the profiler hooks enabled.
        const PROFILER = 1 << 3;
    }
}

impl Options {
    pub fn shared(&self) -> bool {
        self.contains(Options::SHARED)
    }

    pub fn tools(&self) -> bool {
        self.contains(Options::TOOLS)
    }
}

/// The full input of a recipe run. Never mutated once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub os: Os,
    pub compiler: Compiler,
    pub arch: Arch,
    pub build_type: BuildType,
    pub options: Options,
    /// Machine the build runs on; selects the generator binary.
    pub host_os: Os,
    pub host_arch: Arch,
    pub cppstd: Option<u32>,
}

impl BuildSettings {
    /// Settings for a native build on the running machine
    pub fn native(
        os: Os,
        compiler: Compiler,
        arch: Arch,
        build_type: BuildType,
        options: Options,
    ) -> Self {
        Self {
            os,
            compiler,
            arch,
            build_type,
            options,
            host_os: Os::host().unwrap_or(os),
            host_arch: Arch::host().unwrap_or(arch),
            cppstd: None,
        }
    }

    pub fn with_host(mut self, host_os: Os, host_arch: Arch) -> Self {
        self.host_os = host_os;
        self.host_arch = host_arch;
        self
    }

    pub fn with_cppstd(mut self, cppstd: u32) -> Self {
        self.cppstd = Some(cppstd);
        self
    }

    /// Target and compiler summary used in log and error messages
    pub fn describe(&self) -> String {
        format!(
            "{} {} {} ({})",
            self.os, self.arch, self.build_type, self.compiler
        )
    }
}
