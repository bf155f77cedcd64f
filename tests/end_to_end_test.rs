use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use proyo::ignore::parse_ignore_file;
use proyo::loader::{load_macros, load_template, Macros};
use proyo::processor::write_files;
use proyo::script::Value;
use proyo::tree::Tree;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn make_template(root: &Path) {
    write(
        root,
        "_proyo_",
        "\
... = name
... = with_tests
name = 'demo'
with_tests = True
# ~~~
name = ...
... = crate_name
crate_name = name.snake_case()
",
    );
    write(
        root,
        "Cargo.toml",
        "\
[package]
name = \"{{crate_name}}\"
# ~ if with_tests:

[dev-dependencies]
tempfile = \"3\"
# ~
",
    );
    write(root, "src/{{crate_name}}.rs", "pub fn hello() {}\n");
    write(root, "tests/{{crate_name if with_tests else ''}}_test.rs", "#[test]\nfn it_works() {}\n");
    write(root, ".proyoignore", "notes/**\n");
    write(root, "notes/todo.md", "internal");
}

fn generate(template: &Path, output: &Path, variables: IndexMap<String, Value>, macros: Macros) {
    let template = load_template(template).unwrap();
    let ignore = parse_ignore_file(&template).unwrap();
    let mut tree = Tree::new(&template, variables.clone(), macros).with_ignore(ignore);
    let root = tree.root();

    tree.parse(root);
    tree.update_global(root, variables);
    tree.run(root);
    write_files(output, tree.files()).unwrap();
}

#[test]
fn test_generate_project() {
    let template = TempDir::new().unwrap();
    make_template(template.path());
    let expected = TempDir::new().unwrap();
    write(
        expected.path(),
        "Cargo.toml",
        "[package]\nname = \"my_app\"\n\n[dev-dependencies]\ntempfile = \"3\"\n",
    );
    write(expected.path(), "src/my_app.rs", "pub fn hello() {}\n");
    write(expected.path(), "tests/my_app_test.rs", "#[test]\nfn it_works() {}\n");

    let output = TempDir::new().unwrap();
    let output_dir = output.path().join("project");
    let variables = [("name".to_string(), Value::from("my-app"))].into_iter().collect();
    generate(template.path(), &output_dir, variables, Macros::new());

    assert!(!dir_diff::is_different(&output_dir, expected.path()).unwrap());
}

#[test]
fn test_defaults_and_suppressed_files() {
    let template = TempDir::new().unwrap();
    make_template(template.path());
    let expected = TempDir::new().unwrap();
    write(expected.path(), "Cargo.toml", "[package]\nname = \"demo\"\n");
    write(expected.path(), "src/demo.rs", "pub fn hello() {}\n");

    let output = TempDir::new().unwrap();
    let output_dir = output.path().join("project");
    let variables = [("with_tests".to_string(), Value::Bool(false))].into_iter().collect();
    generate(template.path(), &output_dir, variables, Macros::new());

    assert!(!dir_diff::is_different(&output_dir, expected.path()).unwrap());
}

#[test]
fn test_macros_override_template_files() {
    let template = TempDir::new().unwrap();
    make_template(template.path());
    let macro_dir = TempDir::new().unwrap();
    write(macro_dir.path(), "Cargo.toml", "# generated for {{crate_name}}\n");
    let macros = load_macros(macro_dir.path()).unwrap();

    let output = TempDir::new().unwrap();
    let output_dir = output.path().join("project");
    generate(template.path(), &output_dir, IndexMap::new(), macros);

    assert_eq!(
        fs::read_to_string(output_dir.join("Cargo.toml")).unwrap(),
        "# generated for demo\n"
    );
}

#[test]
fn test_missing_template() {
    let temp_dir = TempDir::new().unwrap();
    assert!(load_template(temp_dir.path().join("missing")).is_err());
}
