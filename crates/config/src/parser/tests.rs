//! Tests for the INI parser

use super::*;
use envmatrix_core::Error;
use proptest::prelude::*;
use rstest::rstest;

const SAMPLE: &str = r#"
# top comment
[tox]
envlist = py{36,37}, docs
skip_missing_interpreters = true

[testenv]
deps =
    lxml
    docs: Sphinx   # only for docs
commands = python -m unittest

; another comment
[testenv:docs]
commands:
    make -C doc html

    make -C doc latexpdf
"#;

#[test]
fn test_parse_sections_in_order() {
    let document = parse(SAMPLE).unwrap();
    let names: Vec<&str> = document.sections().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["tox", "testenv", "testenv:docs"]);
}

#[test]
fn test_parse_multiline_values() {
    let document = parse(SAMPLE).unwrap();

    assert_eq!(document.value("testenv", "deps"), Some("lxml\ndocs: Sphinx"));
    assert_eq!(
        document.value("testenv:docs", "commands"),
        Some("make -C doc html\nmake -C doc latexpdf")
    );
    assert_eq!(
        document.value("testenv", "commands"),
        Some("python -m unittest")
    );
}

#[test]
fn test_parse_records_lines() {
    let document = parse(SAMPLE).unwrap();
    let section = document.section("testenv").unwrap();
    assert_eq!(section.line, 7);
    assert_eq!(section.get("deps").unwrap().line, 8);
    assert_eq!(section.get("commands").unwrap().line, 11);
}

#[test]
fn test_first_separator_wins() {
    let document = parse("[s]\nurl = http://example.com\nkey: a = b\n").unwrap();
    assert_eq!(document.value("s", "url"), Some("http://example.com"));
    assert_eq!(document.value("s", "key"), Some("a = b"));
}

#[test]
fn test_empty_document() {
    let document = parse("").unwrap();
    assert_eq!(document.sections().count(), 0);
}

#[rstest]
#[case::key_before_section("deps = lxml\n", 1, "before any section")]
#[case::unclosed_header("[tox\n", 1, "missing ']'")]
#[case::empty_header("[]\n", 1, "section name is empty")]
#[case::trailing_text("[tox] junk\n", 1, "unexpected text")]
#[case::duplicate_section("[tox]\n[tox]\n", 2, "already declared on line 1")]
#[case::missing_separator("[tox]\nenvlist\n", 2, "expected 'key = value'")]
#[case::empty_key("[tox]\n= value\n", 2, "key is empty")]
#[case::duplicate_key("[tox]\na = 1\na = 2\n", 3, "already declared in section 'tox'")]
#[case::orphan_continuation("[tox]\n    lxml\n", 2, "continuation line")]
#[case::orphan_continuation_top("    lxml\n", 1, "continuation line")]
fn test_parse_errors(#[case] text: &str, #[case] expected_line: usize, #[case] fragment: &str) {
    match parse(text) {
        Err(Error::Parse {
            line, message, path, ..
        }) => {
            assert_eq!(line, expected_line);
            assert!(
                message.contains(fragment),
                "message '{message}' should contain '{fragment}'"
            );
            assert!(path.is_none());
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_parse_error_with_path() {
    let err = parse("[tox\n").unwrap_err().with_path("/src/tox.ini");
    assert_eq!(
        err.to_string(),
        "/src/tox.ini:1: parse error: section header is missing ']'"
    );
}

#[test]
fn test_reparse_is_identical() {
    assert_eq!(parse(SAMPLE).unwrap(), parse(SAMPLE).unwrap());
}

proptest! {
    #[test]
    fn test_parse_is_idempotent(
        entries in prop::collection::vec(("[a-z_]{1,8}", "[a-zA-Z0-9 .=<>-]{0,16}"), 0..8)
    ) {
        let mut text = String::from("[testenv]\n");
        let mut seen = std::collections::HashSet::new();
        for (key, value) in &entries {
            if seen.insert(key.clone()) {
                text.push_str(&format!("{key} = {value}\n"));
            }
        }

        let first = parse(&text).unwrap();
        let second = parse(&text).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.section("testenv").unwrap().entries().count(), seen.len());
    }
}
