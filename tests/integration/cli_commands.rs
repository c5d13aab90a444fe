#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use blockdex::storage::btree::BTree;
use tempfile::TempDir;

fn setup(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.idx"));
    (dir, path)
}

fn seed(path: &Path, pairs: &[(u64, u64)]) {
    let mut tree = BTree::create(path).expect("create");
    for (key, value) in pairs {
        tree.insert(*key, *value).expect("insert");
    }
}

fn stdout_of(args: &[&str], dir: &TempDir) -> String {
    let output = cargo_bin_cmd!("blockdex")
        .args(args)
        .env("BLOCKDEX_CONFIG", dir.path().join("no-config.toml"))
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf8 stdout")
}

#[test]
fn create_insert_search_print() {
    let (dir, path) = setup("basic");
    let file = path.to_str().expect("utf8 path");

    let out = stdout_of(&["create", file], &dir);
    assert!(out.contains("Created"));
    stdout_of(&["insert", file, "42", "4200"], &dir);
    stdout_of(&["insert", file, "7", "70"], &dir);

    assert_eq!(stdout_of(&["search", file, "42"], &dir), "42 4200\n");
    assert_eq!(stdout_of(&["print", file], &dir), "7 70\n42 4200\n");
}

#[test]
fn search_miss_exits_with_two() {
    let (dir, path) = setup("miss");
    seed(&path, &[(1, 10)]);
    cargo_bin_cmd!("blockdex")
        .args(["search", path.to_str().expect("utf8 path"), "2"])
        .env("BLOCKDEX_CONFIG", dir.path().join("no-config.toml"))
        .env_remove("RUST_LOG")
        .assert()
        .code(2)
        .stderr("Key not found\n");
}

#[test]
fn duplicate_insert_fails() {
    let (dir, path) = setup("dup");
    seed(&path, &[(5, 50)]);
    let output = cargo_bin_cmd!("blockdex")
        .args(["insert", path.to_str().expect("utf8 path"), "5", "51"])
        .env("BLOCKDEX_CONFIG", dir.path().join("no-config.toml"))
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8 stderr");
    assert!(stderr.contains("key 5 already exists"), "{stderr}");
}

#[test]
fn create_refuses_existing_file_without_force() {
    let (dir, path) = setup("existing");
    seed(&path, &[(1, 1)]);
    let file = path.to_str().expect("utf8 path");

    cargo_bin_cmd!("blockdex")
        .args(["create", file])
        .env("BLOCKDEX_CONFIG", dir.path().join("no-config.toml"))
        .assert()
        .failure();
    assert_eq!(stdout_of(&["print", file], &dir), "1 1\n");

    stdout_of(&["create", "--force", file], &dir);
    assert_eq!(stdout_of(&["print", file], &dir), "");
}

#[test]
fn load_then_extract_round_trips() {
    let (dir, path) = setup("load");
    let file = path.to_str().expect("utf8 path");
    let input = dir.path().join("input.csv");
    let output = dir.path().join("output.csv");
    let mut csv: String = (1..=100u64).rev().map(|k| format!("{k},{}\n", k * 3)).collect();
    csv.push_str("oops\n50,1\n");
    fs::write(&input, csv).expect("write csv");

    stdout_of(&["create", file], &dir);
    let out = stdout_of(&["load", file, input.to_str().expect("utf8 path")], &dir);
    assert!(
        out.contains("Loaded 100 pairs (1 duplicates, 1 malformed lines skipped)"),
        "{out}"
    );

    stdout_of(&["extract", file, output.to_str().expect("utf8 path")], &dir);
    let expected: String = (1..=100u64).map(|k| format!("{k},{}\n", k * 3)).collect();
    assert_eq!(fs::read_to_string(&output).expect("read output"), expected);

    cargo_bin_cmd!("blockdex")
        .args(["extract", file, output.to_str().expect("utf8 path")])
        .env("BLOCKDEX_CONFIG", dir.path().join("no-config.toml"))
        .assert()
        .failure();
}

#[test]
fn verify_and_dump_report_structure() {
    let (dir, path) = setup("inspect");
    let pairs: Vec<(u64, u64)> = (0..20u64).map(|k| (k, k)).collect();
    seed(&path, &pairs);
    let file = path.to_str().expect("utf8 path");

    let out = stdout_of(&["verify", file], &dir);
    assert!(out.starts_with("ok: height=2 nodes=3 leaves=2 keys=20"), "{out}");

    let header = stdout_of(&["dump", file, "0"], &dir);
    assert!(header.contains("header: root=2 next_block=4"), "{header}");
    assert!(header.contains("|4337PRJ3"), "{header}");

    let root = stdout_of(&["dump", file, "2"], &dir);
    assert!(root.contains("num_keys=1 leaf=false"), "{root}");

    cargo_bin_cmd!("blockdex")
        .args(["dump", file, "9"])
        .env("BLOCKDEX_CONFIG", dir.path().join("no-config.toml"))
        .assert()
        .failure();
}

#[test]
fn shell_uses_default_path_from_config() {
    let (dir, path) = setup("shell");
    seed(&path, &[(3, 30), (1, 10)]);
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!("default_path = {:?}\n", path.to_str().expect("utf8 path")),
    )
    .expect("write config");

    let output = cargo_bin_cmd!("blockdex")
        .args(["--config", config.to_str().expect("utf8 path"), "shell"])
        .write_stdin("insert 2 20\nprint\nquit\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(output).expect("utf8 stdout");
    assert!(out.contains("Opened"), "{out}");
    assert!(out.contains("1 10\n2 20\n3 30\n"), "{out}");
    assert!(out.ends_with("Exiting.\n"));
}
