use clap::Parser;
use proyo::cli::Args;
use std::ffi::OsString;
use std::path::PathBuf;

fn make_args(args: &[&str]) -> Vec<OsString> {
    let mut res = vec![OsString::from("proyo")];
    res.extend(args.iter().map(OsString::from));
    res
}

#[test]
fn test_basic_args() {
    let args = make_args(&["./template", "./output"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert_eq!(parsed.template, PathBuf::from("./template"));
    assert_eq!(parsed.output_dir, PathBuf::from("./output"));
    assert!(!parsed.force);
    assert!(!parsed.verbose);
    assert!(!parsed.stdin);
    assert!(!parsed.skip_post_run);
    assert!(!parsed.skip_post_run_check);
    assert!(parsed.define.is_empty());
    assert!(parsed.macros.is_none());
}

#[test]
fn test_all_flags() {
    let args = make_args(&[
        "--force",
        "--verbose",
        "--stdin",
        "--skip-post-run",
        "--skip-post-run-check",
        "--vars-file",
        "vars.yml",
        "--macros",
        "./macros",
        "./template",
        "./output",
    ]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(parsed.force);
    assert!(parsed.verbose);
    assert!(parsed.stdin);
    assert!(parsed.skip_post_run);
    assert!(parsed.skip_post_run_check);
    assert_eq!(parsed.vars_file, Some(PathBuf::from("vars.yml")));
    assert_eq!(parsed.macros, Some(PathBuf::from("./macros")));
}

#[test]
fn test_short_flags() {
    let args = make_args(&["-f", "-v", "-s", "./template", "./output"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(parsed.force);
    assert!(parsed.verbose);
    assert!(parsed.stdin);
}

#[test]
fn test_repeated_definitions() {
    let args = make_args(&["-D", "name=demo", "--define", "count=3", "./t", "./o"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert_eq!(parsed.define, vec!["name=demo", "count=3"]);
}

#[test]
fn test_missing_args() {
    let args = make_args(&["./template"]);
    assert!(Args::try_parse_from(args).is_err());
}

#[test]
fn test_too_many_args() {
    let args = make_args(&["./template", "./output", "extra"]);
    assert!(Args::try_parse_from(args).is_err());
}
