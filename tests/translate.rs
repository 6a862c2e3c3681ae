use std::path::Path;

use anyhow::{Context, Result, ensure};
use pretty_assertions::assert_eq;

use pytoc::ast::Node;
use pytoc::codegen::CodegenError;
use pytoc::{Translator, frontend};
use test_support::{
    Case, CaseClass, InputFormat, check_block_balance, load_cases, normalize_output,
};

fn load_module(case: &Case) -> Result<Node> {
    let source = case.read_program()?;
    match case.spec.input {
        InputFormat::Python => {
            frontend::parse(&source).with_context(|| format!("Parsing {}", case.name))
        }
        InputFormat::AstJson => serde_json::from_str(&source)
            .with_context(|| format!("Decoding AST json for {}", case.name)),
    }
}

fn check_success(translator: &Translator, case: &Case) -> Result<()> {
    let output_file = case
        .spec
        .expected
        .output_file
        .as_deref()
        .with_context(|| format!("Missing output_file in {}", case.name))?;
    let expected = case.read_text(output_file)?;
    let module = load_module(case)?;

    let output = translator
        .translate(module.clone())
        .with_context(|| format!("Translating {}", case.name))?;
    assert_eq!(
        normalize_output(&output),
        normalize_output(&expected),
        "Output mismatch for {}",
        case.name
    );

    let again = translator.translate(module)?;
    ensure!(output == again, "Output for {} is not deterministic", case.name);

    let indent = &translator.generator().options().indent;
    check_block_balance(&output, indent)
        .with_context(|| format!("Unbalanced blocks in {}", case.name))
}

fn check_frontend_error(case: &Case) -> Result<()> {
    let expected_file = case
        .spec
        .expected
        .error_contains_file
        .as_deref()
        .with_context(|| format!("Missing error_contains_file in {}", case.name))?;
    let expected_error = case.read_text(expected_file)?;
    let expected_error = expected_error.trim();

    let source = case.read_program()?;
    let result = frontend::parse(&source);
    ensure!(
        result.is_err(),
        "Expected frontend error in {}, but parsing succeeded",
        case.name
    );
    let actual = result.expect_err("result checked as err").to_string();
    ensure!(
        actual.contains(expected_error),
        "Expected frontend error containing '{expected_error}' in {}, got '{actual}'",
        case.name
    );
    Ok(())
}

fn check_unsupported(translator: &Translator, case: &Case) -> Result<()> {
    let expected_kind = case
        .spec
        .expected
        .unsupported_kind
        .as_deref()
        .with_context(|| format!("Missing unsupported_kind in {}", case.name))?;
    let module = load_module(case)?;

    let result = translator.translate(module);
    ensure!(
        result.is_err(),
        "Expected unsupported construct in {}, but translation succeeded",
        case.name
    );
    let error = result.expect_err("result checked as err");
    let codegen = error
        .downcast_ref::<CodegenError>()
        .with_context(|| format!("Expected CodegenError in {}, got '{error:#}'", case.name))?;
    ensure!(
        codegen.kind() == expected_kind,
        "Expected unsupported '{expected_kind}' in {}, got '{}'",
        case.name,
        codegen.kind()
    );
    Ok(())
}

#[test]
fn translates_program_cases() -> Result<()> {
    let translator = Translator::new();
    let cases = load_cases(Path::new("tests/programs"))?;

    for case in &cases {
        match case.spec.class {
            CaseClass::TranslateSuccess => check_success(&translator, case)?,
            CaseClass::FrontendError => check_frontend_error(case)?,
            CaseClass::UnsupportedConstruct => check_unsupported(&translator, case)?,
        }
    }

    Ok(())
}

#[test]
fn bench_cases_carry_tags() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;
    for case in cases.iter().filter(|case| case.spec.bench.enabled) {
        ensure!(
            !case.spec.bench.tags.is_empty(),
            "Case {} has bench enabled but no tags",
            case.name
        );
        ensure!(
            case.spec.class == CaseClass::TranslateSuccess,
            "Bench case {} must translate successfully",
            case.name
        );
    }
    Ok(())
}

#[test]
fn statements_keep_source_order() -> Result<()> {
    let names = ["alpha", "beta", "gamma", "delta", "epsilon"];
    let source = names
        .iter()
        .map(|name| format!("{name}()\n"))
        .collect::<String>();
    let output = Translator::new().compile(&source)?;

    let calls = output.lines().skip(1).collect::<Vec<_>>();
    let expected = names
        .iter()
        .map(|name| format!("{name}();"))
        .collect::<Vec<_>>();
    assert_eq!(calls, expected);
    Ok(())
}

#[test]
fn translators_run_independently_across_threads() -> Result<()> {
    let sources = [
        "def a():\n    for i in range(3):\n        f(i)\n",
        "def b(x):\n    if x:\n        return 1\n    else:\n        return 2\n",
        "x = y = 1 + 2 * 3\n",
    ];
    let expected = sources
        .iter()
        .map(|source| Translator::new().compile(source))
        .collect::<Result<Vec<_>>>()?;

    let handles = sources
        .iter()
        .map(|source| {
            let source = source.to_string();
            std::thread::spawn(move || Translator::new().compile(&source))
        })
        .collect::<Vec<_>>();
    for (handle, expected) in handles.into_iter().zip(expected) {
        let output = handle.join().expect("translation thread panicked")?;
        assert_eq!(output, expected);
    }
    Ok(())
}
