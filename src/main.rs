use plume_lang::{
    config::ContextFile,
    diagnostics,
    language::parser::parse_template,
    runtime::{render_template, Context},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "Usage: plume-lang render <template> [context.toml] | check <template>";

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let code = match args.as_slice() {
        [command, template] if command == "render" => run_render(Path::new(template), None),
        [command, template, context] if command == "render" => {
            run_render(Path::new(template), Some(PathBuf::from(context)))
        }
        [command, template] if command == "check" => run_check(Path::new(template)),
        _ => {
            eprintln!("{USAGE}");
            1
        }
    };
    process::exit(code);
}

/// Enable with `PLUME_LOG=debug` or `PLUME_LOG=plume_lang=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("PLUME_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(err) => {
            diagnostics::report_io_error(path, &err);
            None
        }
    }
}

fn run_render(path: &Path, context_path: Option<PathBuf>) -> i32 {
    let Some(source) = read_source(path) else {
        return 1;
    };
    let context = match context_path {
        Some(context_path) => match ContextFile::load(&context_path) {
            Ok(file) => file.into_context(),
            Err(err) => {
                diagnostics::report_config_error(&err);
                return 1;
            }
        },
        None => Context::new(),
    };
    let template = match parse_template(&source) {
        Ok(template) => template,
        Err(errors) => {
            diagnostics::emit_syntax_errors(path, &source, &errors);
            return 1;
        }
    };
    match render_template(&source, &template, &context) {
        Ok(output) => {
            print!("{output}");
            0
        }
        Err(err) => {
            diagnostics::report_render_error(path, &source, &err);
            1
        }
    }
}

fn run_check(path: &Path) -> i32 {
    let Some(source) = read_source(path) else {
        return 1;
    };
    match parse_template(&source) {
        Ok(template) => {
            println!(
                "{}: ok ({} top-level statements)",
                path.display(),
                template.statements.len()
            );
            0
        }
        Err(errors) => {
            diagnostics::emit_syntax_errors(path, &source, &errors);
            1
        }
    }
}
