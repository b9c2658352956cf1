//! Endpoint OpenAPI Parser - OpenAPI documents from annotated Rust endpoint types.
//!
//! Types marked `#[endpoint]` are endpoints; their public methods taking `self`
//! become `POST /{endpoint}/{method}` operations, and every type reachable
//! from a parameter or result becomes a component schema.
//!
//! # Architecture
//!
//! 1. [`scanner`] finds the project's Rust files
//! 2. [`source`] parses them into syntax trees with their module paths
//! 3. [`model::loader`] turns structs, enums and impls into [`model::ClassInfo`]s
//! 4. [`discovery`] picks the endpoint classes
//! 5. [`parser`] walks a tree of [`node`]s, letting each [`plugin::Plugin`]
//!    scan, enter and exit every node
//! 6. the built-in [`plugins`] fill in the [`openapi::OpenApi`] document
//! 7. [`serializer`] writes it as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use endpoint_openapi_parser::{
//!     config::ParserConfig,
//!     discovery::EndpointDiscovery,
//!     model::loader::ModelLoader,
//!     parser::Parser,
//!     plugins,
//!     scanner::SourceScanner,
//!     serializer::serialize_yaml,
//!     source::SourceParser,
//! };
//! use std::path::PathBuf;
//!
//! let config = ParserConfig::default();
//! let scanner = SourceScanner::for_project(PathBuf::from("./my-project"));
//! let scan_result = scanner.scan().unwrap();
//!
//! let files: Vec<_> = SourceParser::parse_files(&scan_result.rust_files, scanner.source_root())
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//! let registry = ModelLoader::new(config.endpoint_exposed_annotation.clone()).load(&files);
//! let endpoints = EndpointDiscovery::new(vec![config.endpoint_annotation.clone()])
//!     .discover(&registry)
//!     .unwrap();
//!
//! let plugins = plugins::from_config(&config).unwrap();
//! let output = Parser::new(config)
//!     .plugins(plugins)
//!     .class_registry(registry)
//!     .execute(endpoints)
//!     .unwrap();
//! println!("{}", serialize_yaml(&output.openapi).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod node;
pub mod openapi;
pub mod parser;
pub mod plugin;
pub mod plugins;
pub mod scanner;
pub mod serializer;
pub mod source;
pub mod storage;
