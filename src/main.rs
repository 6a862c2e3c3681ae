use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};

use pytoc::ast::Node;
use pytoc::codegen::CodegenOptions;
use pytoc::{Translator, frontend};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// Python source
    Python,
    /// JSON-encoded syntax tree
    AstJson,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmitType {
    /// C source (default)
    C,
    /// JSON-encoded syntax tree, after passes
    AstJson,
}

#[derive(Parser, Debug)]
#[command(name = "pytoc")]
#[command(version, about = "Translate a small Python subset into C", long_about = None)]
struct Cli {
    /// Input file; reads stdin when omitted
    input: Option<PathBuf>,

    /// Output file; writes stdout when omitted
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// How to read the input
    #[arg(long = "from", value_enum, default_value = "python")]
    from: InputFormat,

    /// What to emit
    #[arg(long = "emit", value_enum, default_value = "c")]
    emit: EmitType,

    /// Spaces per indentation level
    #[arg(long, default_value_t = 4)]
    indent_width: usize,

    /// Return type written for every function
    #[arg(long, default_value = "void")]
    return_type: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let source = read_input(cli.input.as_ref())?;
    let module = match cli.from {
        InputFormat::Python => frontend::parse(&source).context("Parsing Python source")?,
        InputFormat::AstJson => {
            serde_json::from_str::<Node>(&source).context("Decoding AST json")?
        }
    };

    let options = CodegenOptions::default()
        .with_indent_width(cli.indent_width)
        .with_return_type(cli.return_type);
    let translator = Translator::with_options(options);
    let module = translator.run_passes(module)?;

    let output = match cli.emit {
        EmitType::AstJson => {
            let mut json = serde_json::to_string_pretty(&module).context("Encoding AST json")?;
            json.push('\n');
            json
        }
        EmitType::C => {
            let mut output = String::new();
            if let Err(err) = translator.generator().generate_into(&module, &mut output) {
                debug!("partial output before failure:\n{output}");
                return Err(err).context("Generating C");
            }
            output
        }
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, &output).with_context(|| format!("Writing {}", path.display()))?;
            info!("wrote {} bytes to {}", output.len(), path.display());
        }
        None => print!("{output}"),
    }
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Reading {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            Ok(buffer)
        }
    }
}
