//! CLI smoke tests for bgfx-recipe.
//!
//! Only commands without side effects outside a temp directory are run here.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn recipe_cmd(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("bgfx-recipe");
    cmd.current_dir(dir.path())
        .env_remove("ANDROID_NDK_ROOT")
        .env_remove("BGFX_RECIPE_WORK_DIR")
        .env_remove("BGFX_RECIPE_PACKAGE_DIR");
    cmd
}

fn temp_config(content: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("bgfx-recipe.toml"), content).unwrap();
    temp
}

const LINUX_CONFIG: &str = r#"
library = "bgfx"

[settings]
os = "Linux"
arch = "x86_64"
compiler = "gcc"
compiler_version = "13"
host_os = "Linux"
host_arch = "x86_64"

[options]
tools = true
"#;

#[test]
fn help_flag_works() {
    let temp = TempDir::new().unwrap();
    recipe_cmd(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("package"));
}

#[test]
fn version_from_commit_count() {
    let temp = TempDir::new().unwrap();
    recipe_cmd(&temp)
        .args(["version", "--commits", "10234"])
        .assert()
        .success()
        .stdout("2.2.34\n");
}

#[test]
fn version_needs_a_source() {
    let temp = TempDir::new().unwrap();
    recipe_cmd(&temp).arg("version").assert().failure();
}

#[test]
fn plan_prints_generator_and_make_calls() {
    let temp = temp_config(LINUX_CONFIG);
    recipe_cmd(&temp)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("--with-tools --gcc=linux-gcc gmake"))
        .stdout(predicate::str::contains("config=release64 bgfx"))
        .stdout(predicate::str::contains("config=release64 shaderc"));

    // Nothing was fetched.
    assert!(!temp.path().join("build").exists());
}

#[test]
fn plan_flags_override_config() {
    let temp = temp_config(LINUX_CONFIG);
    recipe_cmd(&temp)
        .args(["plan", "--build-type", "debug", "--library", "bimg", "-j", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config=debug64 -j2 bimg_decode"));
}

#[test]
fn plan_android_without_ndk_fails() {
    let temp = temp_config(LINUX_CONFIG);
    recipe_cmd(&temp)
        .args(["plan", "--os", "android", "--compiler", "clang", "--arch", "armv8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NDK"));
}

#[test]
fn plan_rejects_unsupported_option() {
    let temp = temp_config(LINUX_CONFIG);
    recipe_cmd(&temp)
        .args(["plan", "--library", "bx", "--shared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not support"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = temp_config("[settings]\nplatform = \"Linux\"\n");
    recipe_cmd(&temp)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn explicit_config_must_exist() {
    let temp = TempDir::new().unwrap();
    recipe_cmd(&temp)
        .args(["--config", "missing.toml", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}
