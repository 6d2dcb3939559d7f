//! Static variant mapping tables.
//!
//! Every lookup returns `Err(Error::Unsupported)` for combinations that have no
//! entry; nothing falls back to a default.

use crate::error::{Error, Result};
use crate::settings::{Arch, BuildType, CompilerFamily, Os};

/// Visual Studio year for an MSVC version (toolset major or compiler version).
pub fn vs_generator(msvc_version: &str) -> Result<&'static str> {
    match msvc_version {
        "17" | "193" | "194" => Ok("2022"),
        "16" | "192" => Ok("2019"),
        "15" | "191" => Ok("2017"),
        other => Err(Error::unsupported("msvc version to generator", other)),
    }
}

/// GENie `--gcc=` dialect and gmake project folder base for a make-driven build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GccDialect {
    pub flag: &'static str,
    pub folder: &'static str,
}

pub fn gcc_dialect(os: Os, family: CompilerFamily) -> Result<GccDialect> {
    let dialect = match (os, family) {
        (Os::Windows, CompilerFamily::Gcc) => ("mingw-gcc", "mingw-gcc"),
        (Os::Windows, CompilerFamily::Clang) => ("mingw-clang", "mingw-clang"),
        (Os::Linux, CompilerFamily::Gcc) => ("linux-gcc", "linux"),
        (Os::Linux, CompilerFamily::Clang) => ("linux-clang", "linux-clang"),
        (Os::FreeBSD, CompilerFamily::Gcc | CompilerFamily::Clang) => ("freebsd", "freebsd"),
        (Os::Macos, CompilerFamily::Clang | CompilerFamily::AppleClang) => ("osx", "osx"),
        (Os::Android, CompilerFamily::Clang | CompilerFamily::Gcc) => ("android", "android"),
        (Os::Ios, CompilerFamily::Clang | CompilerFamily::AppleClang) => ("ios", "ios"),
        _ => return Err(Error::unsupported("os/compiler to gcc dialect", format!("{os}/{family}"))),
    };
    Ok(GccDialect {
        flag: dialect.0,
        folder: dialect.1,
    })
}

/// Whether the dialect and project folder carry an architecture suffix.
pub fn uses_arch_folder_suffix(os: Os) -> bool {
    matches!(os, Os::Macos | Os::Android | Os::Ios)
}

pub fn arch_folder_suffix(os: Os, arch: Arch) -> Result<&'static str> {
    match (os, arch) {
        (Os::Android | Os::Ios, Arch::X86) => Ok("-x86"),
        (_, Arch::X86_64) => Ok("-x64"),
        (_, Arch::Armv8) => Ok("-arm64"),
        (Os::Android | Os::Ios, Arch::Armv7) => Ok("-arm"),
        _ => Err(Error::unsupported("arch to folder suffix", format!("{os}/{arch}"))),
    }
}

pub fn make_config(build_type: BuildType) -> Result<&'static str> {
    match build_type {
        BuildType::Debug => Ok("config=debug"),
        BuildType::Release => Ok("config=release"),
        other => Err(Error::unsupported("build type to make config", other)),
    }
}

/// Whether the make configuration is suffixed with the word size.
pub fn uses_make_config_suffix(os: Os) -> bool {
    matches!(os, Os::Windows | Os::Linux | Os::FreeBSD)
}

pub fn make_config_suffix(arch: Arch) -> Result<&'static str> {
    match arch {
        Arch::X86 => Ok("32"),
        Arch::X86_64 => Ok("64"),
        other => Err(Error::unsupported("arch to make config suffix", other)),
    }
}

/// MSBuild configuration; every optimized build type maps onto `Release`.
pub fn msbuild_configuration(build_type: BuildType) -> &'static str {
    match build_type {
        BuildType::Debug => "Debug",
        _ => "Release",
    }
}

pub fn msbuild_platform(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "Win32",
        Arch::X86_64 => "x64",
        Arch::Armv7 => "ARM",
        Arch::Armv8 => "ARM64",
    }
}

/// Argument accepted by `vcvarsall.bat` for a target architecture.
pub fn vcvars_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "x86",
        Arch::X86_64 => "x64",
        Arch::Armv7 => "x64_arm",
        Arch::Armv8 => "x64_arm64",
    }
}

/// Folder under `bx/tools/bin` holding the GENie binary for the build machine.
pub fn genie_bin_folder(host: Os) -> Result<&'static str> {
    match host {
        Os::Windows => Ok("windows"),
        Os::Linux | Os::FreeBSD => Ok("linux"),
        Os::Macos => Ok("darwin"),
        other => Err(Error::unsupported("host os to genie binary", other)),
    }
}

pub fn genie_executable(host: Os) -> &'static str {
    if host == Os::Windows { "genie.exe" } else { "genie" }
}
