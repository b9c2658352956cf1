//! Endpoint OpenAPI Parser - command-line front end.
//!
//! # Usage
//!
//! ```bash
//! endpoint-openapi-parser [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! endpoint-openapi-parser ./my-api-project -o openapi.yaml
//! ```
//!
//! Use a configuration file and print the traversal order:
//! ```bash
//! endpoint-openapi-parser ./my-api-project -c parser.yaml --trace -f json
//! ```

use anyhow::Result;
use clap::Parser;
use endpoint_openapi_parser::cli;
use log::info;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Endpoint OpenAPI Parser starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
