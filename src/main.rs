//! Partial Kit CLI
//!
//! Usage:
//!   partial-kit [OPTIONS] <COMMAND>
//!
//! Commands:
//!   render   Render a partial and print its HTML
//!   url      Print the dispatch URL of a partial action
//!   request  Route a request through the dispatcher
//!
//! Options:
//!   -c, --config <FILE>  Configuration file (TOML format)
//!   -v, --verbose        Log debug output to stderr
//!   -h, --help           Print help

use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use partial_kit::{
    register_default_services, DriverContainer, DriverDefinition, MemoryRouter, Params,
    PartialConfig, PartialError, PartialManager, Request, RouteParams,
};

#[derive(Parser)]
#[command(name = "partial-kit")]
#[command(about = "Render and dispatch reusable UI partials")]
struct Cli {
    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a partial and print its HTML
    Render {
        alias: String,

        /// Instance id (defaults to alias + index)
        #[arg(long)]
        id: Option<String>,

        /// Params as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Print the dispatch URL of a partial action
    Url {
        alias: String,

        #[arg(long)]
        controller: Option<String>,

        /// Route channel: get, post, put, patch, options, delete or api
        #[arg(long)]
        method: Option<String>,

        /// Extra URL parameter, repeatable
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Route a request through the dispatcher and print the response
    Request {
        method: String,
        path: String,

        /// Mark the request as XMLHttpRequest
        #[arg(long)]
        xhr: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => match PartialConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => PartialConfig::default(),
    };

    let router = Rc::new(MemoryRouter::new());
    let mut manager = build_manager(config, Rc::clone(&router));

    let result = match cli.command {
        Command::Render { alias, id, params } => render(&mut manager, &alias, id, params),
        Command::Url {
            alias,
            controller,
            method,
            params,
        } => {
            let params: RouteParams = params.into_iter().collect();
            manager
                .route_url(&alias, controller.as_deref(), &params, method.as_deref())
                .map_err(|e| e.to_string())
        }
        Command::Request { method, path, xhr } => {
            request(&mut manager, &router, Request::new(method, path).with_xhr(xhr))
        }
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "partial_kit=debug"
    } else {
        "partial_kit=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_manager(config: PartialConfig, router: Rc<MemoryRouter>) -> PartialManager {
    let mut container = DriverContainer::new();
    register_default_services(&mut container);

    let partials = config.partials.clone();
    let mut manager = PartialManager::builder()
        .config(config)
        .router(router)
        .container(Rc::new(container))
        .build_booted();

    for (alias, type_name) in partials {
        manager.register(&alias, DriverDefinition::type_name(type_name));
    }
    manager
}

fn render(
    manager: &mut PartialManager,
    alias: &str,
    id: Option<String>,
    params: Option<String>,
) -> Result<String, String> {
    let params = match params {
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(&raw).map_err(|e| format!("invalid --params JSON: {e}"))?;
            if !value.is_object() {
                return Err("--params must be a JSON object".to_string());
            }
            Params::from(value)
        }
        None => Params::new(),
    };

    let partial = manager
        .get_with(alias, id.as_deref(), params)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("partial [{alias}] could not be resolved"))?;
    partial.render().map_err(|e| e.to_string())
}

fn request(
    manager: &mut PartialManager,
    router: &MemoryRouter,
    request: Request,
) -> Result<String, String> {
    let matched = router
        .recognize(&request)
        .ok_or_else(|| format!("no route for {} {}", request.method, request.path))?;

    let (Some(partial), Some(controller)) = (
        matched.params.get("partial"),
        matched.params.get("controller"),
    ) else {
        return Err(format!("route [{}] is not a partial route", matched.endpoint));
    };

    let response = manager
        .dispatch(partial, controller, &request)
        .map_err(|e| describe(&e))?;
    Ok(format!("{}\n{}", response.status, response.body))
}

/// Error message followed by its source chain
fn describe(error: &PartialError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
