#![allow(dead_code)]
use std::path::Path;

use pytoc::ast::Node;
use pytoc::frontend;
use test_support::{Case, InputFormat, load_cases};

pub fn bench_cases() -> Vec<Case> {
    load_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load cases: {err:#}"))
        .into_iter()
        .filter(|case| case.spec.bench.enabled && case.spec.input == InputFormat::Python)
        .collect()
}

pub fn load_source(case: &Case) -> String {
    case.read_program()
        .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name))
}

pub fn load_module(case: &Case) -> Node {
    let source = load_source(case);
    frontend::parse(&source).unwrap_or_else(|err| panic!("parse {}: {err}", case.name))
}

/// Concatenates every bench program into one larger module.
pub fn combined_source() -> String {
    bench_cases()
        .iter()
        .map(load_source)
        .collect::<Vec<_>>()
        .join("\n")
}
