//! Schema Form CLI
//!
//! Command-line interface over the form core: resolve schemas, compute
//! default form data, build id/path trees and validate form data.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use schema_form::{
    get_default_form_state, load_json_auto, retrieve_schema, to_id_schema, to_path_schema,
    FormError, FormOptions, FormState, JsonSchemaValidator, ResolveError, SchemaContext,
    DEFAULT_ID_PREFIX,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "schema-form")]
#[command(about = "Resolve JSON Schema forms, compute defaults and order validation errors")]
#[command(version)]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve $ref, allOf, dependencies and additionalProperties for form data
    Resolve {
        #[command(flatten)]
        input: SchemaInput,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compute the form data a form starts from
    Defaults {
        #[command(flatten)]
        input: SchemaInput,

        /// Emit null for properties without a default
        #[arg(long)]
        include_undefined: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build the field id tree
    Ids {
        #[command(flatten)]
        input: SchemaInput,

        /// Id of the root field
        #[arg(long, default_value = DEFAULT_ID_PREFIX)]
        id_prefix: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build the field path tree
    Paths {
        #[command(flatten)]
        input: SchemaInput,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Validate form data, reporting errors in on-screen order
    Validate {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Form data to validate
        #[arg(long)]
        data: String,

        /// UI schema providing ui:order
        #[arg(long)]
        ui_schema: Option<String>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SchemaInput {
    /// Schema source: file path or URL (http:// or https://)
    schema: String,

    /// Root schema for $ref lookup (default: the schema itself)
    #[arg(long)]
    root: Option<String>,

    /// Current form data
    #[arg(long)]
    data: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Resolve { input, output } => run_transform(&input, &output, |schema, ctx, data| {
            retrieve_schema(schema, ctx, data.unwrap_or(&Value::Null))
        }),
        Commands::Defaults {
            input,
            include_undefined,
            output,
        } => run_transform(&input, &output, |schema, ctx, data| {
            get_default_form_state(schema, data, ctx, include_undefined)
        }),
        Commands::Ids {
            input,
            id_prefix,
            output,
        } => run_transform(&input, &output, |schema, ctx, data| {
            to_id_schema(schema, None, ctx, data, &id_prefix)
        }),
        Commands::Paths { input, output } => run_transform(&input, &output, |schema, ctx, data| {
            to_path_schema(schema, "", ctx, data)
        }),
        Commands::Validate {
            schema,
            data,
            ui_schema,
            json,
        } => run_validate(&schema, &data, ui_schema.as_deref(), json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn load(source: &str, what: &str, json_output: bool) -> Result<Value, u8> {
    load_json_auto(source).map_err(|e| {
        report_error(json_output, &format!("loading {}: {}", what, e));
        e.exit_code() as u8
    })
}

fn run_transform<F>(input: &SchemaInput, output: &OutputArgs, transform: F) -> Result<(), u8>
where
    F: FnOnce(&Value, &SchemaContext<'_>, Option<&Value>) -> Result<Value, ResolveError>,
{
    let schema = load(&input.schema, "schema", false)?;
    let root = match &input.root {
        Some(source) => load(source, "root schema", false)?,
        None => schema.clone(),
    };
    let data = match &input.data {
        Some(source) => Some(load(source, "form data", false)?),
        None => None,
    };

    let validator = JsonSchemaValidator::new();
    let ctx = SchemaContext::new(&root, &validator);
    let result = transform(&schema, &ctx, data.as_ref()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&result, output)
}

fn write_output(value: &Value, output: &OutputArgs) -> Result<(), u8> {
    let json_output = if output.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match &output.output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(
    schema_source: &str,
    data_source: &str,
    ui_schema_source: Option<&str>,
    json_output: bool,
) -> Result<(), u8> {
    let schema = load(schema_source, "schema", json_output)?;
    let data = load(data_source, "form data", json_output)?;
    let ui_schema = match ui_schema_source {
        Some(source) => load(source, "ui schema", json_output)?,
        None => Value::Object(Default::default()),
    };

    let validator = JsonSchemaValidator::new();
    let ctx = SchemaContext::new(&schema, &validator);
    let fail = |e: FormError| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    };
    let mut state =
        FormState::new(ctx, &ui_schema, Some(&data), FormOptions::default()).map_err(fail)?;
    let valid = state.validate().map_err(fail)?;

    if valid {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        return Ok(());
    }

    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": state.errors(),
            "errorSchema": state.error_schema(),
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for error in state.errors() {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
