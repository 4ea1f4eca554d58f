//! Cromrun CLI Entry Point
//!
//! Provides the command-line interface for driving a Cromwell engine.
//!
//! # Usage
//!
//! ```bash
//! # Submit a workflow with its inputs
//! cromrun submit pipeline.wdl inputs.json --label sample-id=s001
//!
//! # Track it
//! cromrun status 8bb58566-27e6-4f51-9ada-b2a2e35a9476
//! cromrun explain 8bb58566-27e6-4f51-9ada-b2a2e35a9476
//!
//! # Resubmit a finished workflow from its original files
//! cromrun restart 8bb58566-27e6-4f51-9ada-b2a2e35a9476
//!
//! # Search by label
//! cromrun query name=align status=Failed
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::{ColoredString, Colorize};
use log::{error, info};
use serde_json::{Map, Value};

use cromrun::{
    Connection, Cromwell, LabelSet, QueryValue, WdlSource, WorkflowStatus, WorkflowSubmission,
    APP_NAME, VERSION,
};

/// Default engine host used when none is specified.
const DEFAULT_HOST: &str = "localhost";

/// Default engine port.
const DEFAULT_PORT: u16 = 8000;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    user: String,
    verbose: bool,
    dependencies: Option<PathBuf>,
    labels: Vec<(String, String)>,
    no_cache: bool,
    include_inputs: bool,
    positionals: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            user: env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
            verbose: false,
            dependencies: None,
            labels: Vec::new(),
            no_cache: false,
            include_inputs: false,
            positionals: Vec::new(),
        }
    }
}

/// One resolved CLI command.
#[derive(Debug)]
enum Command {
    Submit { wdl: PathBuf, inputs: PathBuf },
    Restart { workflow_id: String },
    Abort { workflow_id: String },
    Status { workflow_id: String },
    Metadata { workflow_id: String },
    Logs { workflow_id: String },
    Outputs { workflow_id: String },
    Explain { workflow_id: String },
    Label { workflow_id: String, labels: LabelSet },
    Query { terms: Vec<(String, QueryValue)> },
    Backends,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: cromrun [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("Commands:");
    println!("  submit <WDL> <INPUTS>   Submit a workflow with a JSON inputs file");
    println!("  restart <ID>            Resubmit a workflow from its original files");
    println!("  abort <ID>              Ask the engine to abort a workflow");
    println!("  status <ID>             Show a workflow's current status");
    println!("  metadata <ID>           Dump a workflow's full metadata");
    println!("  logs <ID>               Show a workflow's per-call log locations");
    println!("  outputs <ID>            Show a workflow's outputs");
    println!("  explain <ID>            Summarize a workflow, with failed-call logs");
    println!("  label <ID> <K=V>...     Apply labels to a workflow");
    println!("  query <K=V>...          Search workflows by query terms");
    println!("  backends                List the engine's available backends");
    println!();
    println!("Options:");
    println!("  --host HOST             Engine host (default: {})", DEFAULT_HOST);
    println!("  --port PORT             Engine port (default: {})", DEFAULT_PORT);
    println!("  --username USER         Basic-auth username");
    println!("  --password PASS         Basic-auth password");
    println!("  --user NAME             Identity recorded on submissions (default: $USER)");
    println!("  --dependencies ZIP      Subworkflow zip archive (submit)");
    println!("  --label K=V             Label to attach, repeatable (submit)");
    println!("  --no-cache              Disable engine call caching (submit, restart)");
    println!("  --inputs                Include workflow inputs (explain)");
    println!("  --verbose               Enable debug logging");
    println!("  --help                  Show this help message");
    println!("  --version               Show version information");
    println!();
    println!("Examples:");
    println!("  cromrun submit pipeline.wdl inputs.json --label sample-id=s001");
    println!("  cromrun --host btl-cromwell --port 9000 status <ID>");
    println!("  cromrun query name=align status=Failed");
}

/// Splits a `key=value` argument.
fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Expected key=value, got: {}", arg)),
    }
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--no-cache" => {
                config.no_cache = true;
            }
            "--inputs" => {
                config.include_inputs = true;
            }
            "--host" => {
                i += 1;
                if i >= args.len() {
                    return Err("--host requires a host argument".to_string());
                }
                config.host = args[i].clone();
            }
            "--port" => {
                i += 1;
                if i >= args.len() {
                    return Err("--port requires a port argument".to_string());
                }
                config.port = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid port value: {}", args[i]))?;
            }
            "--username" => {
                i += 1;
                if i >= args.len() {
                    return Err("--username requires a value".to_string());
                }
                config.username = Some(args[i].clone());
            }
            "--password" => {
                i += 1;
                if i >= args.len() {
                    return Err("--password requires a value".to_string());
                }
                config.password = Some(args[i].clone());
            }
            "--user" => {
                i += 1;
                if i >= args.len() {
                    return Err("--user requires a name argument".to_string());
                }
                config.user = args[i].clone();
            }
            "--dependencies" => {
                i += 1;
                if i >= args.len() {
                    return Err("--dependencies requires a path argument".to_string());
                }
                config.dependencies = Some(PathBuf::from(&args[i]));
            }
            "--label" => {
                i += 1;
                if i >= args.len() {
                    return Err("--label requires a key=value argument".to_string());
                }
                config.labels.push(parse_key_value(&args[i])?);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                config.positionals.push(arg.clone());
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Resolves the positional arguments into a command.
fn build_command(config: &Config) -> Result<Command, String> {
    let mut positionals = config.positionals.iter();
    let name = positionals
        .next()
        .ok_or_else(|| "No command given".to_string())?;
    let rest: Vec<&String> = positionals.collect();

    let workflow_id = |rest: &[&String]| -> Result<String, String> {
        match rest {
            [id] => Ok((*id).clone()),
            _ => Err(format!("'{}' takes exactly one workflow id", name)),
        }
    };

    match name.as_str() {
        "submit" => match rest.as_slice() {
            [wdl, inputs] => Ok(Command::Submit {
                wdl: PathBuf::from(wdl.as_str()),
                inputs: PathBuf::from(inputs.as_str()),
            }),
            _ => Err("'submit' takes a WDL file and a JSON inputs file".to_string()),
        },
        "restart" => Ok(Command::Restart { workflow_id: workflow_id(&rest)? }),
        "abort" => Ok(Command::Abort { workflow_id: workflow_id(&rest)? }),
        "status" => Ok(Command::Status { workflow_id: workflow_id(&rest)? }),
        "metadata" => Ok(Command::Metadata { workflow_id: workflow_id(&rest)? }),
        "logs" => Ok(Command::Logs { workflow_id: workflow_id(&rest)? }),
        "outputs" => Ok(Command::Outputs { workflow_id: workflow_id(&rest)? }),
        "explain" => Ok(Command::Explain { workflow_id: workflow_id(&rest)? }),
        "label" => match rest.as_slice() {
            [id, pairs @ ..] if !pairs.is_empty() => {
                let mut labels = LabelSet::new();
                for pair in pairs {
                    let (key, value) = parse_key_value(pair)?;
                    labels.insert(key, value);
                }
                Ok(Command::Label {
                    workflow_id: (*id).clone(),
                    labels,
                })
            }
            _ => Err("'label' takes a workflow id and at least one key=value".to_string()),
        },
        "query" => {
            let mut terms = Vec::new();
            for pair in &rest {
                let (key, value) = parse_key_value(pair)?;
                terms.push((key, QueryValue::Scalar(value)));
            }
            if terms.is_empty() {
                return Err("'query' takes at least one key=value term".to_string());
            }
            Ok(Command::Query { terms })
        }
        "backends" => Ok(Command::Backends),
        other => Err(format!("Unknown command: {}", other)),
    }
}

/// Colors a status string the way the terminal output expects.
fn paint_status(status: &str) -> ColoredString {
    match WorkflowStatus::parse(status) {
        Some(WorkflowStatus::Succeeded) => status.green(),
        Some(WorkflowStatus::Failed) => status.red(),
        Some(WorkflowStatus::Running) => status.cyan(),
        Some(WorkflowStatus::Aborted) => status.yellow(),
        _ => status.normal(),
    }
}

/// Reads and syntax-checks a JSON inputs file before anything is submitted.
fn load_inputs(path: &PathBuf) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Could not read inputs file '{}': {}", path.display(), e))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| format!("Inputs file '{}' is not valid JSON: {}", path.display(), e))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(format!("Inputs file '{}' must be a JSON object", path.display()).into()),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Executes one resolved command against a connected client.
async fn run_command(
    cromwell: &Cromwell,
    command: Command,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Submit { wdl, inputs } => {
            let inputs = load_inputs(&inputs)?;
            let mut submission = WorkflowSubmission::new(WdlSource::Path(wdl), inputs)
                .disable_caching(config.no_cache);
            for (key, value) in &config.labels {
                submission = submission.with_label(key, value);
            }
            if let Some(dependencies) = &config.dependencies {
                submission = submission.with_dependencies(dependencies);
            }

            let handle = cromwell.submit(&submission).await?;
            println!("{}  {}", handle.id, paint_status(&handle.status));
        }
        Command::Restart { workflow_id } => {
            match cromwell.restart(&workflow_id, config.no_cache).await? {
                Some(handle) => println!("{}  {}", handle.id, paint_status(&handle.status)),
                None => {
                    return Err(format!(
                        "Workflow {} has no submitted files and can not be restarted",
                        workflow_id
                    )
                    .into())
                }
            }
        }
        Command::Abort { workflow_id } => {
            let response = cromwell.stop(&workflow_id).await?;
            match response.get("status").and_then(Value::as_str) {
                Some(status) if response.get("id").is_some() => {
                    println!("{}  {}", workflow_id, paint_status(status));
                }
                // Engine rejections come back as its own error document.
                _ => print_json(&response)?,
            }
        }
        Command::Status { workflow_id } => {
            let response = cromwell.query_status(&workflow_id).await?;
            let status = response
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            println!("{}  {}", workflow_id, paint_status(status));
        }
        Command::Metadata { workflow_id } => {
            let metadata = cromwell.query_metadata(&workflow_id, false).await?;
            print_json(&metadata)?;
        }
        Command::Logs { workflow_id } => {
            let logs = cromwell.query_logs(&workflow_id).await?;
            print_json(&logs)?;
        }
        Command::Outputs { workflow_id } => {
            let outputs = cromwell.query_outputs(&workflow_id).await?;
            print_json(&outputs)?;
        }
        Command::Explain { workflow_id } => {
            let (summary, extras, logs) =
                cromwell.explain(&workflow_id, config.include_inputs).await?;
            if let Some(status) = summary.status.as_str() {
                println!("{}  {}", workflow_id, paint_status(status));
            }
            print_json(&summary)?;
            if config.include_inputs {
                print_json(&extras)?;
            }
            if logs.failed_jobs.is_some() {
                print_json(&logs)?;
            }
        }
        Command::Label { workflow_id, labels } => {
            let response = cromwell.label(&workflow_id, &labels).await?;
            if !response.is_success() {
                return Err(format!(
                    "Labeling failed with status {}: {}",
                    response.status,
                    response.message()
                )
                .into());
            }
            println!("{}  labels applied", workflow_id);
        }
        Command::Query { terms } => {
            let results = cromwell.query(&terms).await?;
            print_json(&results)?;
        }
        Command::Backends => {
            let backends = cromwell.query_backends().await?;
            print_json(&backends)?;
        }
    }

    Ok(())
}

/// Main application entry point.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    let command = build_command(&config).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let mut connection = Connection::new(config.host.clone(), config.port);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        connection = connection.with_credential(username, password);
    }

    info!("Connecting to {}:{}", config.host, config.port);
    let cromwell = Cromwell::connect(connection, config.user.clone()).await;

    run_command(&cromwell, command, &config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
