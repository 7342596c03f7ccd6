use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Write `content` at `rel` under `root`, creating directories
#[allow(dead_code)]
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub const PAGE_YAML: &str = r#"
_schema:
  required: [title]
  properties:
    title:
      type: string
      _transform: trim
    slug:
      type: string
      _transform: slugify
      _unique: true
    tags:
      type: array
      items:
        type: string
    parent:
      type: [string, "null"]
"#;

pub const USER_YAML: &str = r#"
_access:
  public:
    read_one: false
    read_all: false
_schema:
  properties:
    name:
      type: string
      _transform: [trim, lowercase]
      _unique: true
    password:
      type: string
      _transform: hash
    __note:
      type: string
"#;

/// Project with pages, users, an orphan directory and some noise:
/// - `page/bad.json` lacks its required title and is dropped
/// - `page/broken.json` is not JSON and is skipped
#[allow(dead_code)]
pub fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "__defaults.yaml",
        "_access:\n  public:\n    read_one: true\n    read_all: true\n",
    );
    write(root, "page.yaml", PAGE_YAML);
    write(root, "user.yaml", USER_YAML);

    write(
        root,
        "page/p1.json",
        r#"{ "title": "Home", "slug": "home", "tags": ["a"], "_created_at": "2020-01-01T00:00:00.000Z" }"#,
    );
    write(
        root,
        "page/p2.json",
        r#"{ "id": "overridden", "title": "About", "parent": "page/p1", "_created_at": "2021-01-01T00:00:00.000Z" }"#,
    );
    write(root, "page/bad.json", r#"{ "slug": "no-title" }"#);
    write(root, "page/broken.json", "{ not json");
    write(root, "user/u1.json", r#"{ "name": "ann", "__note": "vip" }"#);
    write(root, "orphan/o1.json", r#"{ "x": 1 }"#);
    write(root, "notes.txt", "ignored");
    write(root, "page/nested/deep.json", r#"{ "title": "too deep" }"#);

    dir
}
