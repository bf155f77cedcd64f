use proyo::constants::IGNORE_FILE;
use proyo::ignore::parse_ignore_file;
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_parse_ignore_file() {
    let temp_dir = TempDir::new().unwrap();

    // Test without .proyoignore
    let glob_set = parse_ignore_file(temp_dir.path()).unwrap();
    assert!(glob_set.is_match("sub/.DS_Store")); // Default pattern
    assert!(glob_set.is_match(IGNORE_FILE));
    assert!(glob_set.is_match(".git/config"));
    assert!(!glob_set.is_match("main.rs"));

    // Test with .proyoignore
    let mut file = File::create(temp_dir.path().join(IGNORE_FILE)).unwrap();
    writeln!(file, "*.pyc\n\n# build output\ntarget/**").unwrap();

    let glob_set = parse_ignore_file(temp_dir.path()).unwrap();
    assert!(glob_set.is_match("file.pyc"));
    assert!(glob_set.is_match("target/debug/app"));
    assert!(!glob_set.is_match("# build output"));
    assert!(glob_set.is_match(".git")); // Default pattern still works
}

#[test]
fn test_invalid_pattern() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join(IGNORE_FILE), "a[\n").unwrap();

    assert!(parse_ignore_file(temp_dir.path()).is_err());
}
