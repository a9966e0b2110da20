//! Binary behaviour: flags, exit codes and the written file.

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use typebridge::BANNER;

const MODELS: &str = r#"from pydantic import BaseModel


class LoginCredentials(BaseModel):
    username: str
    password: str
"#;

fn typebridge(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("typebridge").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("schemas.py"), MODELS).unwrap();
    dir
}

#[test]
fn schema_flag_prints_config_schema() {
    let dir = TempDir::new().unwrap();
    let output = typebridge(dir.path()).arg("--schema").output().unwrap();
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["config_path"], ".typebridge/config.toml");
    assert_eq!(response["format"], "toml");
    assert!(response["schema"]["properties"]["json2ts_cmd"].is_object());
}

#[test]
fn missing_generator_exits_with_error_and_no_file() {
    let dir = project();
    let out = dir.path().join("apiTypes.ts");

    let assert = typebridge(dir.path())
        .args(["--module", "schemas", "--output"])
        .arg(&out)
        .arg("--json2ts-cmd")
        .arg(dir.path().join("missing-json2ts"))
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains("npm install -g json-schema-to-typescript"),
        "{}",
        stderr
    );
    assert!(!out.exists());
}

#[test]
fn module_is_required() {
    let dir = project();
    let assert = typebridge(dir.path())
        .args(["--output", "out.ts"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("no module given"), "{}", stderr);
}

#[test]
fn unknown_module_fails() {
    let dir = project();
    let assert = typebridge(dir.path())
        .args(["--module", "nowhere.to.be.found", "--output", "out.ts"])
        .args(["--json2ts-cmd", "sh -c true"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("nowhere.to.be.found"), "{}", stderr);
    assert!(!dir.path().join("out.ts").exists());
}

#[cfg(unix)]
mod with_fake_generator {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Emits fixed declarations, including the aggregator root.
    const FAKE_JSON2TS: &str = r#"#!/bin/sh
cat <<'EOF'
export interface LoginCredentials {
  username: string;
  password: string;
}
/**
 * Root.
 */
export interface _Aggregate_ {
  LoginCredentials: LoginCredentials;
}
EOF
"#;

    fn install(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("fake-json2ts");
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn writes_declarations_with_banner() {
        let dir = project();
        let fake = install(dir.path(), FAKE_JSON2TS);

        typebridge(dir.path())
            .args(["--module", "schemas", "--output", "apiTypes.ts"])
            .arg("--json2ts-cmd")
            .arg(&fake)
            .assert()
            .success();

        let written = fs::read_to_string(dir.path().join("apiTypes.ts")).unwrap();
        assert_eq!(
            written,
            format!(
                "{}export interface LoginCredentials {{\n  username: string;\n  password: string;\n}}\n",
                BANNER
            )
        );
    }

    #[test]
    fn project_config_supplies_settings() {
        let dir = project();
        let fake = install(dir.path(), FAKE_JSON2TS);
        fs::create_dir_all(dir.path().join(".typebridge")).unwrap();
        fs::write(
            dir.path().join(".typebridge/config.toml"),
            format!(
                "module = \"schemas\"\noutput = \"fromConfig.ts\"\njson2ts_cmd = \"{}\"\n",
                fake.display()
            ),
        )
        .unwrap();

        typebridge(dir.path()).assert().success();
        assert!(dir.path().join("fromConfig.ts").exists());
    }

    #[test]
    fn failing_generator_reports_stderr() {
        let dir = project();
        let fake = install(dir.path(), "#!/bin/sh\necho 'schema rejected' >&2\nexit 1\n");
        let out = dir.path().join("apiTypes.ts");

        let assert = typebridge(dir.path())
            .args(["--module", "schemas", "--output"])
            .arg(&out)
            .arg("--json2ts-cmd")
            .arg(&fake)
            .assert()
            .failure()
            .code(1);
        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
        assert!(stderr.contains("schema rejected"), "{}", stderr);
        assert!(!out.exists());
    }
}
