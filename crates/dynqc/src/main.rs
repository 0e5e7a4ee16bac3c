//! The dynq command-line driver.
//!
//! - `dynq check <expr>` - Parse an expression and print its type and tree
//! - `dynq eval <expr>` - Parse and evaluate an expression
//! - `dynq order <list>` - Parse an ordering list and print each key
//!
//! Options:
//! - `--param name:Type[=value]` - Declare a parameter (repeatable)
//! - `--it Type[=value]` - Declare the implicit parameter
//! - `--result-type` - Require the expression to convert to a type
//! - `--json` - Output results and diagnostics as JSON
//! - `--no-color` - Disable colorized output
//! - `--log-level` - Log level when `DYNQ_LOG` is not set

mod logging;
mod params;

use std::process;

use clap::{Args, Parser, Subcommand};

use dynq_common::error::ParseError;
use dynq_parser::{render_diagnostic, DiagnosticOptions, Param, ParseContext};
use dynq_rt::EvalError;
use dynq_typeck::{Ty, Value};

use params::ParamSpec;

#[derive(Parser)]
#[command(name = "dynq", version, about = "The dynq expression compiler")]
struct Cli {
    /// Log level when DYNQ_LOG is not set
    #[arg(long = "log-level", global = true, default_value = "warn", value_parser = logging::LEVELS)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and print its type and tree
    Check {
        expr: String,

        /// Type the expression must convert to
        #[arg(long = "result-type", value_parser = params::parse_type)]
        result_type: Option<Ty>,

        #[command(flatten)]
        scope: Scope,
    },
    /// Parse and evaluate an expression
    Eval {
        expr: String,

        /// Type the expression must convert to
        #[arg(long = "result-type", value_parser = params::parse_type)]
        result_type: Option<Ty>,

        #[command(flatten)]
        scope: Scope,
    },
    /// Parse an ordering list and print each key with its direction
    Order {
        list: String,

        #[command(flatten)]
        scope: Scope,
    },
}

#[derive(Args)]
struct Scope {
    /// Declare a parameter as name:Type[=value]
    #[arg(long = "param", value_parser = params::parse_param)]
    params: Vec<ParamSpec>,

    /// Declare the implicit parameter as Type[=value]
    #[arg(long = "it", value_parser = params::parse_it)]
    it: Option<ParamSpec>,

    /// Output results and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Disable colorized output
    #[arg(long = "no-color")]
    no_color: bool,
}

/// Why a command failed.
#[derive(Debug)]
pub enum Failure {
    Parse {
        error: ParseError,
        source: String,
        origin: String,
    },
    Eval(EvalError),
    Usage(String),
}

impl Failure {
    pub fn parse(error: ParseError, source: &str, origin: &str) -> Self {
        Failure::Parse {
            error,
            source: source.to_string(),
            origin: origin.to_string(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let (scope, result) = match &cli.command {
        Commands::Check {
            expr,
            result_type,
            scope,
        } => (scope, check(expr, result_type.as_ref(), scope)),
        Commands::Eval {
            expr,
            result_type,
            scope,
        } => (scope, eval(expr, result_type.as_ref(), scope)),
        Commands::Order { list, scope } => (scope, order(list, scope)),
    };

    if let Err(failure) = result {
        report(&failure, &scope.options());
        process::exit(1);
    }
}

impl Scope {
    fn options(&self) -> DiagnosticOptions {
        DiagnosticOptions {
            color: !self.no_color && !self.json,
            json: self.json,
        }
    }

    /// Declared parameters, `it` first, each with its value if one was given.
    fn bindings(&self) -> Result<Vec<(Param, Option<Value>)>, Failure> {
        self.it
            .iter()
            .chain(&self.params)
            .map(|spec| Ok((spec.param(), spec.value()?)))
            .collect()
    }
}

fn context(bindings: &[(Param, Option<Value>)]) -> ParseContext<'static> {
    ParseContext::new().parameters(bindings.iter().map(|(p, _)| p.clone()))
}

fn check(source: &str, result_type: Option<&Ty>, scope: &Scope) -> Result<(), Failure> {
    let bindings = scope.bindings()?;
    let lambda = context(&bindings)
        .parse_lambda(source, result_type)
        .map_err(|error| Failure::parse(error, source, "<expr>"))?;

    if scope.json {
        let out = serde_json::json!({
            "type": lambda.body.ty.to_string(),
            "tree": lambda.body.to_string(),
        });
        println!("{out}");
    } else {
        println!("type: {}", lambda.body.ty);
        println!("tree: {}", lambda.body);
    }
    Ok(())
}

fn eval(source: &str, result_type: Option<&Ty>, scope: &Scope) -> Result<(), Failure> {
    let bindings = scope.bindings()?;
    let lambda = context(&bindings)
        .parse_lambda(source, result_type)
        .map_err(|error| Failure::parse(error, source, "<expr>"))?;

    let args = bindings
        .into_iter()
        .map(|(param, value)| {
            value.ok_or_else(|| {
                Failure::Usage(format!(
                    "parameter '{}' has no value",
                    param.name().unwrap_or("it")
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let value = dynq_rt::compile(&lambda)
        .invoke(&args)
        .map_err(Failure::Eval)?;

    if scope.json {
        let out = serde_json::json!({
            "type": lambda.body.ty.to_string(),
            "value": render(&value),
        });
        println!("{out}");
    } else {
        println!("{}", render(&value));
    }
    Ok(())
}

fn order(source: &str, scope: &Scope) -> Result<(), Failure> {
    let bindings = scope.bindings()?;
    let keys = context(&bindings)
        .parse_ordering(source)
        .map_err(|error| Failure::parse(error, source, "<ordering>"))?;

    for key in &keys {
        let direction = if key.ascending { "ascending" } else { "descending" };
        if scope.json {
            let out = serde_json::json!({
                "key": key.selector.to_string(),
                "type": key.selector.ty.to_string(),
                "direction": direction,
            });
            println!("{out}");
        } else {
            println!("{} {direction}", key.selector);
        }
    }
    Ok(())
}

/// Display form of a result; sequences list their items.
fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(array) => {
            let items: Vec<String> = array.items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

fn report(failure: &Failure, options: &DiagnosticOptions) {
    let (code, message) = match failure {
        Failure::Parse {
            error,
            source,
            origin,
        } => {
            let rendered = render_diagnostic(error, source, origin, options);
            eprintln!("{}", rendered.trim_end());
            return;
        }
        Failure::Eval(e) => ("R0001", e.to_string()),
        Failure::Usage(msg) => ("C0001", msg.clone()),
    };
    if options.json {
        let msg = serde_json::json!({
            "code": code,
            "severity": "error",
            "message": message,
            "file": "",
            "spans": [],
        });
        eprintln!("{msg}");
    } else {
        eprintln!("error: {message}");
    }
}
