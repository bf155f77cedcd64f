use indexmap::IndexMap;
use proyo::fragment::{run_chunk, ChunkOutcome, Phase};
use proyo::loader::Macros;
use proyo::script::{parse_program, ErrorKind, Interpreter, ScriptResult, Value};
use proyo::tree::Tree;
use tempfile::TempDir;

/// Runs `source` as a chunk with no imports and returns its locals.
fn run(source: &str) -> ScriptResult<IndexMap<String, Value>> {
    let temp_dir = TempDir::new().unwrap();
    let mut tree = Tree::new(temp_dir.path(), IndexMap::new(), Macros::new());
    let root = tree.root();
    let program = parse_program(source)?;
    let mut interpreter = Interpreter::with_locals(&mut tree, root, IndexMap::new());
    interpreter.execute(&program)?;
    Ok(interpreter.into_locals())
}

fn get(source: &str, name: &str) -> Value {
    run(source).unwrap().get(name).cloned().unwrap_or_default()
}

#[test]
fn test_arithmetic_follows_python() {
    assert_eq!(get("r = -7 // 2", "r"), Value::Int(-4));
    assert_eq!(get("r = -7 % 3", "r"), Value::Int(2));
    assert_eq!(get("r = 7 / 2", "r"), Value::Float(3.5));
    assert_eq!(get("r = 2 + 3 * 4", "r"), Value::Int(14));
    assert_eq!(get("r = 'ab' * 3", "r"), Value::from("ababab"));
    assert_eq!(get("r = [1] + [2]", "r"), Value::List(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn test_boolean_operators_return_operands() {
    assert_eq!(get("r = '' or 'fallback'", "r"), Value::from("fallback"));
    assert_eq!(get("r = 0 and 1", "r"), Value::Int(0));
    assert_eq!(get("r = not []", "r"), Value::Bool(true));
    assert_eq!(get("r = 'yes' if 1 < 2 < 3 else 'no'", "r"), Value::from("yes"));
    assert_eq!(get("r = 1 < 3 < 2", "r"), Value::Bool(false));
}

#[test]
fn test_membership_and_identity() {
    assert_eq!(get("r = 'b' in ['a', 'b']", "r"), Value::Bool(true));
    assert_eq!(get("r = 'k' not in {'k': 1}", "r"), Value::Bool(false));
    assert_eq!(get("r = 'ell' in 'hello'", "r"), Value::Bool(true));
    assert_eq!(get("x = None\nr = x is None", "r"), Value::Bool(true));
    assert_eq!(get("r = 1 is not None", "r"), Value::Bool(true));
}

#[test]
fn test_collections() {
    let locals = run("\
items = [1, 2]
items.append(3)
items.extend([4])
config = {'name': 'demo'}
config['version'] = 2
config['version'] += 1
last = items[-1]
where = items.index(3)
")
    .unwrap();

    assert_eq!(
        locals["items"],
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)])
    );
    assert_eq!(locals["last"], Value::Int(4));
    assert_eq!(locals["where"], Value::Int(2));
    match &locals["config"] {
        Value::Map(entries) => assert_eq!(entries["version"], Value::Int(3)),
        other => panic!("Expected dict, got {:?}", other),
    }
}

#[test]
fn test_loops() {
    let locals = run("\
total = 0
for i in range(10):
    if i % 2 == 0:
        continue
    if i > 7:
        break
    total += i
pairs = []
for key, value in {'a': 1, 'b': 2}.items():
    pairs.append(key + str(value))
n = 3
while n:
    n -= 1
")
    .unwrap();

    assert_eq!(locals["total"], Value::Int(1 + 3 + 5 + 7));
    assert_eq!(
        locals["pairs"],
        Value::List(vec![Value::from("a1"), Value::from("b2")])
    );
    assert_eq!(locals["n"], Value::Int(0));
}

#[test]
fn test_if_elif_else() {
    let source = "\
if kind == 'lib':
    r = 1
elif kind == 'bin':
    r = 2
else:
    r = 3
";
    assert_eq!(get(&format!("kind = 'bin'\n{source}"), "r"), Value::Int(2));
    assert_eq!(get(&format!("kind = 'x'\n{source}"), "r"), Value::Int(3));
}

#[test]
fn test_string_methods() {
    let locals = run("\
name = '  My Project  '.strip()
snake = name.snake_case()
kebab = name.kebab_case()
parts = 'a,b,c'.split(',')
joined = '-'.join(parts)
starts = name.startswith('My')
")
    .unwrap();

    assert_eq!(locals["snake"], Value::from("my_project"));
    assert_eq!(locals["kebab"], Value::from("my-project"));
    assert_eq!(locals["joined"], Value::from("a-b-c"));
    assert_eq!(locals["starts"], Value::Bool(true));
}

#[test]
fn test_node_surface() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
    let mut tree = Tree::new(
        temp_dir.path(),
        [("name".to_string(), Value::from("demo"))].into_iter().collect(),
        Macros::new(),
    );
    let root = tree.root();
    let program = parse_program("\
has = 'name' in proyo
missing = 'nope' in proyo
fallback = proyo.get_var('nope', 'default')
same = proyo.root == folder
child = proyo.sub('sub', extra=1)
proyo.update(local_only=True)
proyo.update_global(everywhere=True)
")
    .unwrap();

    let mut interpreter = Interpreter::with_scope(&mut tree, root);
    interpreter.execute(&program).unwrap();

    let scope = tree.scope(root);
    assert_eq!(scope.get("has"), Some(&Value::Bool(true)));
    assert_eq!(scope.get("missing"), Some(&Value::Bool(false)));
    assert_eq!(scope.get("fallback"), Some(&Value::from("default")));
    assert_eq!(scope.get("same"), Some(&Value::Bool(true)));

    let Some(Value::Node(child)) = scope.get("child").cloned() else {
        panic!("Expected a node handle");
    };
    let child_scope = tree.scope(child);
    assert_eq!(child_scope.get("extra"), Some(&Value::Int(1)));
    assert_eq!(child_scope.get("name"), Some(&Value::from("demo")));
    assert!(!child_scope.contains("local_only"));
    assert_eq!(child_scope.get("everywhere"), Some(&Value::Bool(true)));
}

#[test]
fn test_mount_error_becomes_value_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut tree = Tree::new(temp_dir.path(), IndexMap::new(), Macros::new());
    let root = tree.root();
    let program = parse_program("proyo.sub('missing')").unwrap();

    let mut interpreter = Interpreter::with_scope(&mut tree, root);
    let err = interpreter.execute(&program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert!(err.detail.starts_with("Subdirectory does not exist"));
}

#[test]
fn test_errors_carry_kind_and_line() {
    let err = run("a = 1\nb = undefined_name\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NameError);
    assert_eq!(err.line, Some(2));

    let err = run("x = [1]\ny = x[5]").unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexError);

    let err = run("x = {}\ny = x['k']").unwrap_err();
    assert_eq!(err.kind, ErrorKind::KeyError);

    let err = run("x = 1 + 'a'").unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);

    let err = run("break").unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);

    let err = run("if True:\nx = 1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndentationError);
}

#[test]
fn test_config_as_rejected_outside_with() {
    let temp_dir = TempDir::new().unwrap();
    let mut tree = Tree::new(temp_dir.path(), IndexMap::new(), Macros::new());
    let root = tree.root();
    let program = parse_program("proyo.config_as(collect_files=False)").unwrap();

    let mut interpreter = Interpreter::with_scope(&mut tree, root);
    let err = interpreter.execute(&program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
}

/// Runs `source` as the RUN chunk of a control file on a fresh tree.
fn run_as_chunk(source: &str) -> ChunkOutcome {
    let temp_dir = TempDir::new().unwrap();
    let mut tree = Tree::new(temp_dir.path(), IndexMap::new(), Macros::new());
    let root = tree.root();
    run_chunk(&mut tree, root, Phase::Run, source, "_proyo_")
}

fn failed_kind(outcome: ChunkOutcome) -> ErrorKind {
    match outcome {
        ChunkOutcome::Failed(err) => err.kind,
        other => panic!("expected a failed chunk, got {other:?}"),
    }
}

#[test]
fn test_range_near_integer_limit_stops_without_overflow() {
    let outcome = run_as_chunk(
        "items = list(range(9223372036854775806, 9223372036854775807, 5))\n... = items",
    );
    let ChunkOutcome::Exported(exports) = outcome else {
        panic!("range near the integer limit should succeed");
    };
    assert_eq!(
        exports["items"],
        Value::List(vec![Value::Int(9223372036854775806)])
    );
}

#[test]
fn test_oversized_sequences_fail_the_chunk() {
    assert_eq!(
        failed_kind(run_as_chunk("x = [0] * 9223372036854775807")),
        ErrorKind::OverflowError
    );
    assert_eq!(
        failed_kind(run_as_chunk("x = 'ab' * 9223372036854775807")),
        ErrorKind::OverflowError
    );
    assert_eq!(
        failed_kind(run_as_chunk("for i in range(9223372036854775807): pass")),
        ErrorKind::OverflowError
    );
}

#[test]
fn test_negating_smallest_integer_fails_the_chunk() {
    assert_eq!(
        failed_kind(run_as_chunk("x = -(-9223372036854775807 - 1)")),
        ErrorKind::OverflowError
    );
}

#[test]
fn test_floor_division_overflow_fails_the_chunk() {
    assert_eq!(
        failed_kind(run_as_chunk("x = (-9223372036854775807 - 1) // -1")),
        ErrorKind::OverflowError
    );
}
