use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

pub const A: &str = "aaaa-0000-0000-0001";
pub const B: &str = "aaaa-0000-0000-0002";
pub const C: &str = "aaaa-0000-0000-0003";

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Chain of nodes a -> b -> c plus one entity the public cannot read
pub fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "__defaults.yaml", "_access:\n  public:\n    read_all: true\n");
    write(
        root,
        "node.yaml",
        "_schema:\n  properties:\n    name:\n      type: string\n    links:\n      type: array\n      items:\n        type: string\n    __x:\n      type: string\n",
    );
    write(
        root,
        "secret.yaml",
        "_access:\n  public:\n    read_all: false\n_schema:\n  properties:\n    code:\n      type: string\n",
    );

    let nodes = [(A, "a", Some(B)), (B, "b", Some(C)), (C, "c", None)];
    for (i, (id, name, next)) in nodes.iter().enumerate() {
        let links: Vec<String> = next.iter().map(|n| format!("node/{}", n)).collect();
        let record = serde_json::json!({
            "name": name,
            "links": links,
            "__x": "hidden",
            "_created_at": format!("2020-01-0{}T00:00:00.000Z", i + 1),
        });
        write(root, &format!("node/{}.json", id), &record.to_string());
    }
    write(root, "secret/s1.json", r#"{ "code": "42" }"#);

    dir
}

pub fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flatstore"))
        .args(args)
        .output()
        .expect("failed to execute flatstore")
}

/// Run a command that must succeed and parse its stdout
pub fn run_json(args: &[&str]) -> Value {
    let output = run(args);
    assert!(
        output.status.success(),
        "flatstore {:?} failed. Stderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}
