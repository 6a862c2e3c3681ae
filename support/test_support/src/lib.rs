use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseClass {
    TranslateSuccess,
    FrontendError,
    UnsupportedConstruct,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    #[default]
    Python,
    AstJson,
}

impl InputFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Python => "program.py",
            Self::AstJson => "program.json",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BenchConfig {
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedOutcome {
    pub output_file: Option<String>,
    pub error_contains_file: Option<String>,
    /// Kind named by an `UnsupportedConstruct` failure.
    pub unsupported_kind: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseSpec {
    pub class: CaseClass,
    #[serde(default)]
    pub input: InputFormat,
    #[serde(default)]
    pub bench: BenchConfig,
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub dir: PathBuf,
    pub program_path: PathBuf,
    pub spec: CaseSpec,
}

impl Case {
    pub fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }

    pub fn read_program(&self) -> Result<String> {
        fs::read_to_string(&self.program_path)
            .with_context(|| format!("Reading {}", self.program_path.display()))
    }
}

pub fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: CaseSpec = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        let program_path = path.join(spec.input.file_name());
        ensure!(
            program_path.exists(),
            "Missing {} for case {}",
            spec.input.file_name(),
            path.display()
        );

        cases.push(Case {
            name: case_name,
            dir: path,
            program_path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

pub fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

/// Checks that every `{` line has a `}` line at the same indentation and that
/// nothing closes below the left margin.
pub fn check_block_balance(output: &str, indent: &str) -> Result<()> {
    ensure!(!indent.is_empty(), "Indentation unit must not be empty");
    let mut open = Vec::new();
    for (number, line) in output.lines().enumerate() {
        let mut depth = 0;
        let mut rest = line;
        while let Some(stripped) = rest.strip_prefix(indent) {
            depth += 1;
            rest = stripped;
        }
        if rest.starts_with('}') {
            let opened = open
                .pop()
                .with_context(|| format!("Line {} closes a block that was never opened", number + 1))?;
            ensure!(
                opened == depth,
                "Line {} closes at depth {depth}, block opened at depth {opened}",
                number + 1
            );
        }
        if rest.ends_with('{') {
            open.push(depth);
        }
    }
    ensure!(open.is_empty(), "{} blocks left open", open.len());
    Ok(())
}
