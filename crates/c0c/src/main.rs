use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use c0_compiler::compiler::{self, CompileOptions, error::CompileError, tokenizer};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Compiles C0 source into stack machine instructions", long_about = None)]
struct Args {
    /// The source file. `-` reads from stdin.
    pub input: PathBuf,
    /// Where to write the result. `-` writes to stdout.
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,
    /// How deeply blocks and expressions may nest.
    #[arg(long, default_value_t = CompileOptions::default().max_nesting_depth)]
    pub max_nesting_depth: u32,
    /// Print the token stream instead of compiling.
    #[arg(long)]
    pub tokens: bool,
}

impl Args {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            max_nesting_depth: self.max_nesting_depth,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let source = match read_input(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read {}: {err}", args.input.display());
            return ExitCode::from(2);
        }
    };
    let result = if args.tokens {
        dump_tokens(&source)
    } else {
        compile(&source, args.options())
    };
    let text = match result {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{}: {}", args.input.display(), err.with_context(&source));
            return ExitCode::from(1);
        }
    };
    if let Err(err) = write_output(&args.output, &text) {
        eprintln!("failed to write {}: {err}", args.output.display());
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

fn is_std_stream(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if is_std_stream(path) {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(path)
    }
}

fn write_output(path: &Path, text: &str) -> std::io::Result<()> {
    if is_std_stream(path) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    } else {
        std::fs::write(path, text)
    }
}

fn compile(source: &str, options: CompileOptions) -> Result<String, CompileError> {
    let program = compiler::compile_program(source, options)?;
    log::info!(
        "compiled {} functions, {} globals",
        program.functions.len(),
        program.globals.len()
    );
    Ok(program.to_string())
}

/// Renders each token as `<kind> <start>..<end>` on its own line.
fn dump_tokens(source: &str) -> Result<String, CompileError> {
    let mut out = String::new();
    for token in tokenizer::tokenize(source) {
        let token = token?;
        out.push_str(&format!(
            "{kind} {span}\n",
            kind = token.token_type.name(),
            span = token.span,
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use c0_compiler::compiler::error::ErrorKind;

    #[test]
    fn tokens_are_listed_with_spans() {
        assert_eq!(
            dump_tokens("let x: int;").unwrap(),
            "let 0..3\nidentifier 4..5\n: 5..6\ntype 7..10\n; 10..11\neof 11..11\n"
        );
    }

    #[test]
    fn token_dump_stops_at_first_error() {
        assert_eq!(
            dump_tokens("let ! x").unwrap_err().kind,
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn compile_renders_program() {
        let text = compile("fn main() -> void {}", CompileOptions::default()).unwrap();
        assert!(text.starts_with("static [0] fn main\n"));
        assert!(text.contains("fn [1] 0 0 -> 0 {\n    stackalloc 0\n    call 0\n}\n"));
    }

    #[test]
    fn compile_error_has_line_and_column() {
        let source = "fn main() -> void {\n  x = 1;\n}";
        let err = compile(source, CompileOptions::default()).unwrap_err();
        assert_eq!(
            err.with_context(source).to_string(),
            "not declared at 2:3: x"
        );
    }

    #[test]
    fn args_default_to_stdout() {
        let args = Args::try_parse_from(["c0c", "prog.c0"]).unwrap();
        assert_eq!(args.input, PathBuf::from("prog.c0"));
        assert!(is_std_stream(&args.output));
        assert!(!args.tokens);
        assert_eq!(args.options(), CompileOptions::default());
    }

    #[test]
    fn args_accept_overrides() {
        let args = Args::try_parse_from([
            "c0c",
            "-",
            "-o",
            "out.txt",
            "--max-nesting-depth",
            "8",
            "--tokens",
        ])
        .unwrap();
        assert!(is_std_stream(&args.input));
        assert_eq!(args.output, PathBuf::from("out.txt"));
        assert_eq!(args.options().max_nesting_depth, 8);
        assert!(args.tokens);
    }
}
