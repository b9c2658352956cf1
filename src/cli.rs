use crate::config::ParserConfig;
use crate::discovery::EndpointDiscovery;
use crate::model::loader::ModelLoader;
use crate::parser::Parser as EndpointParser;
use crate::plugins;
use crate::scanner::SourceScanner;
use crate::serializer::{serialize, write_to_file, OutputFormat};
use crate::source::{SourceFile, SourceParser};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Endpoint OpenAPI Parser - Generate an OpenAPI document from annotated Rust endpoint types
#[derive(Parser, Debug)]
#[command(name = "endpoint-openapi-parser")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Parser configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Print the traversal order to stderr
    #[arg(long = "trace")]
    pub trace: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!("Project path does not exist: {}", args.project_path.display());
    }
    if !args.project_path.is_dir() {
        anyhow::bail!("Project path is not a directory: {}", args.project_path.display());
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    if let Some(config) = &args.config_path {
        info!("Configuration: {}", config.display());
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let config = match &args.config_path {
        Some(path) => ParserConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ParserConfig::default(),
    };

    // Step 1: Scan the source tree
    let scanner = SourceScanner::for_project(args.project_path.clone());
    let scan_result = scanner.scan()?;
    info!("Found {} Rust files", scan_result.rust_files.len());
    if scan_result.rust_files.is_empty() {
        anyhow::bail!("No Rust files found in {}", scanner.source_root().display());
    }

    // Step 2: Parse files into syntax trees
    let parsed_files: Vec<SourceFile> =
        SourceParser::parse_files(&scan_result.rust_files, scanner.source_root())
            .into_iter()
            .filter_map(|r| match r {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    debug!("Skipping file due to parse error: {}", e);
                    None
                }
            })
            .collect();
    info!("Successfully parsed {} files", parsed_files.len());
    if parsed_files.is_empty() {
        anyhow::bail!("No files could be parsed successfully");
    }

    // Step 3: Build class models and find the endpoints
    let registry = ModelLoader::new(config.endpoint_exposed_annotation.clone()).load(&parsed_files);
    info!("Loaded {} classes", registry.len());

    let discovery = EndpointDiscovery::new(vec![config.endpoint_annotation.clone()]);
    let endpoints = discovery.discover(&registry)?;
    info!("Found {} endpoints", endpoints.len());
    if endpoints.is_empty() {
        warn!(
            "No types marked with #[{}] were found; the document will have no paths",
            config.endpoint_annotation
        );
    }

    // Step 4: Traverse with the configured plugins
    let plugins = plugins::from_config(&config)?;
    let mut parser = EndpointParser::new(config).plugins(plugins).class_registry(registry);
    if args.trace {
        parser = parser.with_trace();
    }
    let output = parser.execute(endpoints)?;

    if let Some(trace) = &output.trace {
        for line in trace {
            eprintln!("{}", line);
        }
    }

    // Step 5: Serialize and write
    let content = serialize(&output.openapi, args.output_format)?;
    match &args.output_path {
        Some(output_path) => {
            write_to_file(&content, output_path)?;
            info!("Successfully wrote OpenAPI document to {}", output_path.display());
        }
        None => println!("{}", content),
    }

    info!("Generation complete!");
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Paths: {}", output.openapi.paths.len());
    info!("  - Schemas: {}", output.openapi.components.schemas.len());

    Ok(())
}
