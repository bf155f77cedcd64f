use indexmap::IndexMap;
use proyo::config::Config;
use proyo::error::Error;
use proyo::loader::Macros;
use proyo::script::Value;
use proyo::tree::Tree;
use tempfile::TempDir;

fn params(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert!(config.collect_files());
    assert_eq!(config.var_regex().as_str(), r"\{\{(.*?)\}\}");
}

#[test_log::test]
fn test_apply_known_and_unknown_keys() {
    let mut config = Config::default();
    config
        .apply(&params(&[
            ("collect_files", Value::Bool(false)),
            ("var_regex", Value::from("<%(.*?)%>")),
            ("colour", Value::from("blue")),
        ]))
        .unwrap();

    assert!(!config.collect_files());
    assert_eq!(config.var_regex().as_str(), "<%(.*?)%>");
}

#[test]
fn test_apply_is_all_or_nothing() {
    let mut config = Config::default();

    let result = config.apply(&params(&[
        ("collect_files", Value::Bool(false)),
        ("var_regex", Value::from("no group")),
    ]));
    assert!(matches!(result, Err(Error::ConfigError(_))));
    assert!(config.collect_files());

    assert!(config.apply(&params(&[("var_regex", Value::from("(unclosed"))])).is_err());
    assert!(config.apply(&params(&[("collect_files", Value::from("yes"))])).is_err());
    assert_eq!(config.var_regex().as_str(), r"\{\{(.*?)\}\}");
}

#[test]
fn test_with_config_restores_on_every_path() {
    let temp_dir = TempDir::new().unwrap();
    let mut tree = Tree::new(temp_dir.path(), IndexMap::new(), Macros::new());
    let root = tree.root();
    let overrides = params(&[("collect_files", Value::Bool(false))]);

    let seen = tree
        .with_config(root, &overrides, |tree| tree.node(root).config().collect_files())
        .unwrap();
    assert!(!seen);
    assert!(tree.node(root).config().collect_files());

    let failed: Result<(), String> = tree
        .with_config(root, &overrides, |_| Err("body failed".to_string()))
        .unwrap();
    assert!(failed.is_err());
    assert!(tree.node(root).config().collect_files());
}

#[test]
fn test_child_inherits_config_then_diverges() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
    let mut tree = Tree::new(temp_dir.path(), IndexMap::new(), Macros::new());
    let root = tree.root();

    tree.configure(root, &params(&[("collect_files", Value::Bool(false))]))
        .unwrap();
    let sub = tree.mount(root, "sub", IndexMap::new()).unwrap();
    assert!(!tree.node(sub).config().collect_files());

    tree.configure(sub, &params(&[("collect_files", Value::Bool(true))]))
        .unwrap();
    assert!(tree.node(sub).config().collect_files());
    assert!(!tree.node(root).config().collect_files());
}
