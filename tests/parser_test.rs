use proyo::parser::{
    get_variables, load_from_file, parse_definition, parse_json_variables, VariableSources,
};
use proyo::script::Value;
use tempfile::TempDir;

#[test]
fn test_parse_definition() {
    assert_eq!(
        parse_definition("name=demo").unwrap(),
        ("name".to_string(), Value::from("demo"))
    );
    assert_eq!(
        parse_definition("count=3").unwrap(),
        ("count".to_string(), Value::Int(3))
    );
    assert_eq!(
        parse_definition("flag=true").unwrap(),
        ("flag".to_string(), Value::Bool(true))
    );
    assert_eq!(
        parse_definition("url=a=b").unwrap(),
        ("url".to_string(), Value::from("a=b"))
    );
    assert!(parse_definition("novalue").is_err());
    assert!(parse_definition("=3").is_err());
}

#[test]
fn test_parse_json_variables() {
    let vars = parse_json_variables(r#"{"name": "demo", "tags": ["a", "b"]}"#, "stdin").unwrap();
    assert_eq!(vars["name"], Value::from("demo"));
    assert_eq!(
        vars["tags"],
        Value::List(vec![Value::from("a"), Value::from("b")])
    );

    assert!(parse_json_variables("", "stdin").unwrap().is_empty());
    assert!(parse_json_variables("[1, 2]", "stdin").is_err());
    assert!(parse_json_variables("{", "stdin").is_err());
}

#[test]
fn test_load_from_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("vars.yaml");
    std::fs::write(&path, "name: demo\nversion: 2\n").unwrap();

    let vars = load_from_file(&path).unwrap();
    assert_eq!(vars["name"], Value::from("demo"));
    assert_eq!(vars["version"], Value::Int(2));
}

#[test]
fn test_definitions_override_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("vars.json");
    std::fs::write(&path, r#"{"name": "from-file", "kind": "lib"}"#).unwrap();

    let definitions = vec!["name=from-cli".to_string()];
    let vars = get_variables(&VariableSources {
        stdin: false,
        vars_file: Some(&path),
        definitions: &definitions,
    })
    .unwrap();

    assert_eq!(vars["name"], Value::from("from-cli"));
    assert_eq!(vars["kind"], Value::from("lib"));
}
