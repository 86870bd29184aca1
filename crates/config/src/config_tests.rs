//! Resolution tests against a realistic matrix

use crate::config::{Config, ConfigContext, Problem};
use envmatrix_core::{EnvironmentVariables, Error};
use proptest::prelude::*;
use rstest::rstest;
use std::path::{Path, PathBuf};

const ELEMENTPATH: &str = r#"
[tox]
envlist =
    py{38,39,310,311}, pypy3, docs, flake8,
    mypy-py{38,39}, coverage
skip_missing_interpreters = true
toxworkdir = {homedir}/.tox/elementpath

[testenv]
deps =
    py{38,39,310,311},pypy3,coverage: lxml
    py{38,39,310,311},pypy3,coverage: xmlschema>=1.2.3
    docs: Sphinx
    coverage: coverage
commands = python -m unittest
allowlist_externals = make

[testenv:docs]
commands =
    make -C doc html
    make -C doc latexpdf
    make -C doc doctest

[testenv:flake8]
deps =
    flake8
commands =
    flake8 elementpath

[testenv:mypy-py{38,39}]
deps =
    mypy==0.950
    lxml-stubs
commands =
    mypy --strict elementpath

[testenv:coverage]
setenv =
    COVERAGE_FILE = {toxworkdir}/.coverage.{envname}
commands =
    coverage run -p -m unittest
    - coverage combine
    coverage report -m

[flake8]
max-line-length = 100
"#;

fn context() -> ConfigContext {
    let mut host_env = EnvironmentVariables::new();
    host_env.insert("CI", "true");
    ConfigContext::new("/src/elementpath")
        .with_homedir("/home/dev")
        .with_host_env(host_env)
}

fn config() -> Config {
    Config::parse(ELEMENTPATH, context()).unwrap()
}

#[test]
fn test_flake8_environment() {
    let env = config().resolve("flake8").unwrap();
    assert_eq!(env.dependency_strings(), vec!["flake8"]);
    assert_eq!(env.command_strings(), vec!["flake8 elementpath"]);
    assert_eq!(env.basepython, None);
}

#[test]
fn test_docs_environment_filters_base_deps() {
    let env = config().resolve("docs").unwrap();
    assert_eq!(env.dependency_strings(), vec!["Sphinx"]);
    assert_eq!(
        env.command_strings(),
        vec![
            "make -C doc html",
            "make -C doc latexpdf",
            "make -C doc doctest"
        ]
    );
    assert_eq!(env.allowlist_externals, vec!["make"]);
}

#[test]
fn test_python_environment_uses_base_section() {
    let env = config().resolve("py310").unwrap();
    assert_eq!(env.dependency_strings(), vec!["lxml", "xmlschema>=1.2.3"]);
    assert_eq!(env.command_strings(), vec!["python -m unittest"]);
    assert_eq!(env.basepython.as_deref(), Some("python3.10"));
    assert_eq!(env.changedir, PathBuf::from("/src/elementpath"));
    assert_eq!(
        env.envdir,
        PathBuf::from("/home/dev/.tox/elementpath/py310")
    );
}

#[test]
fn test_generative_section_applies_to_each_name() {
    let config = config();
    for name in ["mypy-py38", "mypy-py39"] {
        let env = config.resolve(name).unwrap();
        assert_eq!(env.dependency_strings(), vec!["mypy==0.950", "lxml-stubs"]);
        assert_eq!(env.factors, vec!["mypy", name.trim_start_matches("mypy-")]);
    }
    assert_eq!(
        config.resolve("mypy-py39").unwrap().basepython.as_deref(),
        Some("python3.9")
    );
}

#[test]
fn test_coverage_environment() {
    let env = config().resolve("coverage").unwrap();
    assert_eq!(
        env.dependency_strings(),
        vec!["lxml", "xmlschema>=1.2.3", "coverage"]
    );
    assert_eq!(
        env.setenv.get("COVERAGE_FILE").map(String::as_str),
        Some("/home/dev/.tox/elementpath/.coverage.coverage")
    );
    let ignored: Vec<bool> = env.commands.iter().map(|c| c.ignore_exit).collect();
    assert_eq!(ignored, vec![false, true, false]);
}

#[test]
fn test_declared_environments_keep_envlist_order() {
    let config = config();
    let names: Vec<&str> = config.environment_names().collect();
    assert_eq!(
        names,
        vec![
            "py38",
            "py39",
            "py310",
            "py311",
            "pypy3",
            "docs",
            "flake8",
            "mypy-py38",
            "mypy-py39",
            "coverage"
        ]
    );
    assert!(config.global().skip_missing_interpreters);
    assert_eq!(
        config.global().toxworkdir,
        PathBuf::from("/home/dev/.tox/elementpath")
    );
}

#[test]
fn test_unknown_environment() {
    let err = config().resolve("py27").unwrap_err();
    match err {
        Error::UnknownEnvironment { name, available } => {
            assert_eq!(name, "py27");
            assert!(available.contains(&"docs".to_string()));
        }
        other => panic!("expected unknown environment, got {other:?}"),
    }
}

#[test]
fn test_resolve_is_deterministic() {
    let config = config();
    assert_eq!(config.resolve("docs").unwrap(), config.resolve("docs").unwrap());
    assert_eq!(config.resolve_all().unwrap().len(), 10);
}

#[test]
fn test_section_only_environment_is_declared() {
    let config = Config::parse(
        "[testenv]\ncommands = pytest\n\n[testenv:lint]\ncommands = ruff check .\n",
        context(),
    )
    .unwrap();
    assert!(config.global().envlist.is_empty());
    assert_eq!(config.default_environments(), vec!["lint"]);
    assert_eq!(
        config.global().toxworkdir,
        Path::new("/src/elementpath/.tox")
    );
}

#[test]
fn test_exact_section_wins_over_generative() {
    let config = Config::parse(
        "[testenv:py{37,38}]\ncommands = generic\n\n[testenv:py38]\ncommands = specific\n",
        context(),
    )
    .unwrap();
    assert_eq!(config.resolve("py37").unwrap().command_strings(), vec!["generic"]);
    assert_eq!(config.resolve("py38").unwrap().command_strings(), vec!["specific"]);
}

#[test]
fn test_env_section_overrides_base_per_key() {
    let config = Config::parse(
        "[tox]\nenvlist = a\n\n[testenv]\ndeps = base\ncommands = base-cmd\nchangedir = tests\n\n[testenv:a]\ncommands = own-cmd\n",
        context(),
    )
    .unwrap();
    let env = config.resolve("a").unwrap();
    assert_eq!(env.dependency_strings(), vec!["base"]);
    assert_eq!(env.command_strings(), vec!["own-cmd"]);
    assert_eq!(env.changedir, PathBuf::from("/src/elementpath/tests"));
}

#[test]
fn test_conflicting_pins_fail_resolution() {
    let config = Config::parse(
        "[testenv:a]\ndeps =\n    lxml==4.6\n    a: lxml==4.7\ncommands = x\n",
        context(),
    )
    .unwrap();
    assert!(matches!(
        config.resolve("a"),
        Err(Error::DependencyConflict { .. })
    ));
}

#[rstest]
#[case("ignore_errors = maybe")]
#[case("commands = python -c 'unterminated")]
#[case("setenv = NOEQUALS")]
#[case("commands = echo {bogus}")]
fn test_invalid_settings_fail_resolution(#[case] line: &str) {
    let text = format!("[testenv:a]\n{line}\n");
    let config = Config::parse(&text, context()).unwrap();
    assert!(config.resolve("a").is_err());
}

#[test]
fn test_check_reports_problems() {
    let config = Config::parse(
        "[tox]\nenvlist = empty, broken, fine\n\n[testenv:broken]\ncommands = echo {env:NOPE}\n\n[testenv:fine]\ncommands = true\n",
        context(),
    )
    .unwrap();
    let problems = config.check();
    assert_eq!(problems.len(), 2);
    assert!(matches!(&problems[0], Problem::NoCommands { environment } if environment == "empty"));
    assert!(matches!(&problems[1], Problem::Unresolvable { environment, .. } if environment == "broken"));
    assert!(problems[0].to_string().contains("no commands"));
}

#[test]
fn test_bad_section_pattern_is_a_parse_error() {
    let err = Config::parse("[testenv:py{38]\ncommands = x\n", context()).unwrap_err();
    assert!(matches!(err, Error::Parse { line: 1, .. }));
}

#[test]
fn test_envlist_brace_groups_are_not_placeholders() {
    let config = Config::parse("[tox]\nenvlist = py{38,39}, docs\n", context()).unwrap();
    assert_eq!(config.default_environments(), vec!["py38", "py39", "docs"]);
}

#[test]
fn test_command_paths_with_spaces_stay_one_argument() {
    let config = Config::parse(
        "[testenv:a]\ncommands =\n    python {toxinidir}/run.py\n    - pytest --basetemp={envtmpdir}\nchangedir = {toxinidir}/tests\n",
        ConfigContext::new("/home/dev/My Projects/pkg"),
    )
    .unwrap();
    let env = config.resolve("a").unwrap();
    assert_eq!(
        env.commands[0].argv,
        vec!["python", "/home/dev/My Projects/pkg/run.py"]
    );
    assert_eq!(
        env.commands[1].argv,
        vec!["pytest", "--basetemp=/home/dev/My Projects/pkg/.tox/a/tmp"]
    );
    assert!(env.commands[1].ignore_exit);
    assert_eq!(env.changedir, PathBuf::from("/home/dev/My Projects/pkg/tests"));
}

#[test]
fn test_positional_arguments_reach_argv_intact() {
    let posargs = vec!["-k".to_string(), "a\nb".to_string(), "it's".to_string()];
    let config = Config::parse(
        "[testenv:a]\ncommands =\n    pytest {posargs}\n    flake8\n",
        context().with_posargs(posargs),
    )
    .unwrap();
    let env = config.resolve("a").unwrap();
    assert_eq!(env.commands.len(), 2);
    assert_eq!(env.commands[0].argv, vec!["pytest", "-k", "a\nb", "it's"]);
    assert_eq!(env.commands[1].argv, vec!["flake8"]);
}

#[test]
fn test_invalid_global_boolean() {
    let err = Config::parse("[tox]\nskipsdist = sometimes\n", context()).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

fn matrix_text(versions: &[String], flavours: &[String]) -> String {
    format!(
        "[tox]\nenvlist = py{{{versions}}}-{{{flavours}}}, lint\n\n\
         [testenv]\ndeps =\n    base\n    py{{{first_version}}}: only-py{first_version}\n    \
         {first_flavour}: extra-{first_flavour}\n    lint: ruff\n\
         commands = run {{posargs:tests}} {{toxinidir}}\n\n\
         [testenv:lint]\ncommands = ruff check .\n",
        versions = versions.join(","),
        flavours = flavours.join(","),
        first_version = versions[0],
        first_flavour = flavours[0],
    )
}

proptest! {
    #[test]
    fn test_reparsing_yields_identical_environments(
        versions in prop::collection::btree_set("[0-9]{1,2}", 1..4),
        flavours in prop::collection::btree_set("[a-z]{2,5}", 1..3),
    ) {
        let versions: Vec<String> = versions.into_iter().collect();
        let flavours: Vec<String> = flavours.into_iter().collect();
        let text = matrix_text(&versions, &flavours);

        let first = Config::parse(&text, context()).unwrap().resolve_all().unwrap();
        let second = Config::parse(&text, context()).unwrap().resolve_all().unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), versions.len() * flavours.len() + 1);
        for env in &first {
            prop_assert!(!env.commands.is_empty());
            prop_assert!(env.dependency_strings().contains(&"base".to_string()));
        }
    }

    #[test]
    fn test_declared_names_match_envlist(
        names in prop::collection::btree_set("[a-z][a-z0-9]{0,6}", 1..6)
    ) {
        let envlist: Vec<String> = names.into_iter().collect();
        let text = format!("[tox]\nenvlist = {}\n", envlist.join(", "));
        let config = Config::parse(&text, context()).unwrap();
        let declared: Vec<String> = config.environment_names().map(String::from).collect();
        prop_assert_eq!(&declared, &envlist);
        prop_assert_eq!(config.default_environments(), envlist);
    }
}
