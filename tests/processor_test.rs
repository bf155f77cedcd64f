use indexmap::IndexMap;
use proyo::generator::Content;
use proyo::processor::{ensure_output_dir, is_rendered_path_valid, write_files};
use tempfile::TempDir;

#[test]
fn test_ensure_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    // Test non-existent directory
    let new_dir = path.join("new_dir");
    assert!(ensure_output_dir(&new_dir, false).is_ok());

    // Test existing directory without force
    assert!(ensure_output_dir(path, false).is_err());

    // Test existing directory with force
    assert!(ensure_output_dir(path, true).is_ok());
}

#[test]
fn test_is_rendered_path_valid() {
    assert!(!is_rendered_path_valid(""));
    assert!(!is_rendered_path_valid("output//filename.txt"));
    assert!(!is_rendered_path_valid("/filename.txt"));
    assert!(!is_rendered_path_valid("../filename.txt"));
    assert!(!is_rendered_path_valid("a/../../filename.txt"));
    assert!(is_rendered_path_valid("filename.txt"));
    assert!(is_rendered_path_valid("output/filename.txt"));
}

#[test]
fn test_write_files() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out");

    let mut files = IndexMap::new();
    files.insert("README.md".to_string(), Content::Text("# demo".to_string()));
    files.insert("assets/logo.bin".to_string(), Content::Binary(vec![0xff, 0x00, 0xfe]));

    let report = write_files(&output, &files).unwrap();
    assert_eq!(report.files, vec!["README.md", "assets/logo.bin"]);
    assert_eq!(std::fs::read_to_string(output.join("README.md")).unwrap(), "# demo");
    assert_eq!(
        std::fs::read(output.join("assets/logo.bin")).unwrap(),
        vec![0xff, 0x00, 0xfe]
    );
}

#[test]
fn test_write_files_rejects_escaping_path() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out");

    let mut files = IndexMap::new();
    files.insert("ok.txt".to_string(), Content::Text("ok".to_string()));
    files.insert("../evil.txt".to_string(), Content::Text("evil".to_string()));

    assert!(write_files(&output, &files).is_err());
    assert!(!output.join("ok.txt").exists());
    assert!(!temp_dir.path().join("evil.txt").exists());
}
