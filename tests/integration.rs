// Integration tests drive the binary as a subprocess against throwaway project roots.
use predicates::prelude::*;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

const EXECUTABLE: &str = if cfg!(windows) { "main.exe" } else { "main" };

fn hakobu(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("hakobu").unwrap();

    cmd.arg("--root").arg(root);

    cmd
}

/// Lays out `dist/main/` the way a onedir build does.
fn onedir_project() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let onedir = root.path().join("dist").join("main");

    fs::create_dir_all(onedir.join("_internal").join("encodings")).unwrap();
    fs::write(onedir.join(EXECUTABLE), vec![0u8; 4096]).unwrap();
    fs::write(onedir.join("_internal").join("base_library.zip"), "zip").unwrap();
    fs::write(
        onedir.join("_internal").join("encodings").join("utf_8.pyc"),
        "pyc",
    )
    .unwrap();

    root
}

fn backend_dir(root: &Path) -> PathBuf {
    root.join("frontend").join("backend")
}

/// Relative path -> contents for every file, and `None` for every directory, under `dir`.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut entries = BTreeMap::new();

    for entry in walkdir::WalkDir::new(dir).min_depth(1) {
        let entry = entry.unwrap();
        let relative = entry.path().strip_prefix(dir).unwrap().to_path_buf();
        let contents = if entry.file_type().is_file() {
            Some(fs::read(entry.path()).unwrap())
        } else {
            None
        };
        entries.insert(relative, contents);
    }

    entries
}

#[test]
fn missing_executable_exits_with_one_and_leaves_empty_destination() {
    let root = tempfile::tempdir().unwrap();
    let stale = backend_dir(root.path()).join("stale.txt");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old build").unwrap();

    hakobu(root.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("build.sh"));

    let backend = backend_dir(root.path());
    assert!(backend.is_dir());
    assert_eq!(fs::read_dir(&backend).unwrap().count(), 0);
}

#[test]
fn destination_mirrors_onedir_build() {
    let root = onedir_project();

    hakobu(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(0.00 MB)"))
        .stdout(predicate::str::contains("Backend ready for packaging"));

    assert_eq!(
        snapshot(&backend_dir(root.path())),
        snapshot(&root.path().join("dist").join("main"))
    );
}

#[test]
fn running_twice_matches_running_once() {
    let root = onedir_project();

    hakobu(root.path()).assert().success();
    let first = snapshot(&backend_dir(root.path()));

    fs::write(backend_dir(root.path()).join("leftover.log"), "x").unwrap();

    hakobu(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaning up existing backend directory"));

    assert_eq!(snapshot(&backend_dir(root.path())), first);
}

#[cfg(unix)]
#[test]
fn copied_executable_is_executable() {
    use std::os::unix::fs::PermissionsExt;

    let root = onedir_project();
    let source = root.path().join("dist").join("main").join(EXECUTABLE);
    fs::set_permissions(&source, fs::Permissions::from_mode(0o644)).unwrap();

    hakobu(root.path()).assert().success();

    let mode = fs::metadata(backend_dir(root.path()).join(EXECUTABLE))
        .unwrap()
        .permissions()
        .mode();
    assert_ne!(mode & 0o111, 0);
}

#[test]
fn config_files_are_copied_byte_for_byte() {
    let root = onedir_project();
    let config = root.path().join("dist").join("config");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("settings.yaml"), "server:\n  port: 8080\n").unwrap();
    fs::write(config.join("models.json"), "{\"default\": \"small\"}").unwrap();
    fs::write(config.join(".env"), [0xffu8, 0x00, 0x10]).unwrap();

    hakobu(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 3 config files"));

    assert_eq!(
        snapshot(&backend_dir(root.path()).join("config")),
        snapshot(&config)
    );
}

#[test]
fn missing_config_directory_only_warns() {
    let root = onedir_project();

    hakobu(root.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No config files found"));

    assert!(!backend_dir(root.path()).join("config").exists());
}

#[test]
fn bundled_config_scenario() {
    let root = onedir_project();
    let onedir = root.path().join("dist").join("main");
    fs::create_dir_all(onedir.join("config")).unwrap();
    fs::write(onedir.join("config").join("settings.yaml"), "level: debug\n").unwrap();

    hakobu(root.path()).assert().success();

    let backend = backend_dir(root.path());
    assert_eq!(
        fs::metadata(backend.join(EXECUTABLE)).unwrap().len(),
        fs::metadata(onedir.join(EXECUTABLE)).unwrap().len()
    );
    assert_eq!(
        fs::read_to_string(backend.join("config").join("settings.yaml")).unwrap(),
        "level: debug\n"
    );
}

#[test]
fn dry_run_leaves_destination_untouched() {
    let root = onedir_project();
    let marker = backend_dir(root.path()).join("keep.txt");
    fs::create_dir_all(marker.parent().unwrap()).unwrap();
    fs::write(&marker, "keep").unwrap();

    hakobu(root.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_library.zip"))
        .stdout(predicate::str::contains("Staging plan"));

    assert!(marker.is_file());
    assert!(!backend_dir(root.path()).join(EXECUTABLE).exists());
}

#[test]
fn settings_file_and_dest_override_are_honoured() {
    let root = tempfile::tempdir().unwrap();
    let onedir = root.path().join("build").join("server");
    fs::create_dir_all(&onedir).unwrap();
    let executable = if cfg!(windows) { "server.exe" } else { "server" };
    fs::write(onedir.join(executable), "bin").unwrap();
    fs::write(
        root.path().join("hakobu.toml"),
        "dist = \"build\"\nonedir = \"server\"\nexecutable = \"server\"\n",
    )
    .unwrap();

    hakobu(root.path())
        .arg("--dest")
        .arg("bundle")
        .assert()
        .success();

    assert!(root.path().join("bundle").join(executable).is_file());
    assert!(!backend_dir(root.path()).exists());
}

#[test]
fn malformed_settings_file_fails() {
    let root = onedir_project();
    fs::write(root.path().join("hakobu.toml"), "dist = [").unwrap();

    hakobu(root.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to parse toml file"));
}

#[test]
fn destination_inside_build_output_is_refused() {
    let root = onedir_project();
    let executable = root.path().join("dist").join("main").join(EXECUTABLE);

    for dest in ["dist", "dist/main/out", "."] {
        hakobu(root.path())
            .arg("--dest")
            .arg(dest)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("destination_overlaps_source"));

        assert!(executable.is_file(), "build output deleted for --dest {dest}");
    }
}

#[cfg(unix)]
#[test]
fn links_in_the_build_are_copied_as_links() {
    use std::os::unix::fs::symlink;

    let root = onedir_project();
    let onedir = root.path().join("dist").join("main");
    symlink("does-not-exist.dylib", onedir.join("libfoo.dylib")).unwrap();
    symlink("_internal", onedir.join("internal-link")).unwrap();

    hakobu(root.path()).assert().success();

    let backend = backend_dir(root.path());
    assert_eq!(
        fs::read_link(backend.join("libfoo.dylib")).unwrap(),
        Path::new("does-not-exist.dylib")
    );
    assert_eq!(
        fs::read_link(backend.join("internal-link")).unwrap(),
        Path::new("_internal")
    );
    assert_eq!(snapshot(&backend), snapshot(&onedir));
}
