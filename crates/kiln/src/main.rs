// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kiln - a self-correcting code agent.
//!
//! This is the binary entry point: `kiln run`, `kiln tools`, `kiln skills`
//! and `kiln config`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod inspect;
mod run;
mod stack;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kiln_config::model::KilnConfig;

/// Kiln - plan, generate, verify and fix code until it runs.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about, long_about = None)]
struct Cli {
    /// Load this configuration file instead of the standard search path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one task through the plan-generate-verify-fix loop.
    Run {
        /// Skill that guides the task.
        #[arg(long, short)]
        skill: String,

        /// Print the final task status as JSON.
        #[arg(long)]
        json: bool,

        /// The request, in plain words.
        #[arg(required = true, trailing_var_arg = true)]
        request: Vec<String>,
    },
    /// List registered tools.
    Tools,
    /// List available skills, or show one.
    Skills {
        /// Skill to load and describe.
        id: Option<String>,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => kiln_config::load_and_validate_path(path),
        None => kiln_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            kiln_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.agent.log_level);

    let outcome = match cli.command {
        Commands::Run {
            skill,
            json,
            request,
        } => run::run_task(&config, &skill, &request.join(" "), json).await,
        Commands::Tools => inspect::list_tools(&config).map(|()| ExitCode::SUCCESS),
        Commands::Skills { id } => inspect::show_skills(&config, id.as_deref())
            .await
            .map(|()| ExitCode::SUCCESS),
        Commands::Config => print_config(&config).map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("kiln: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_config(config: &KilnConfig) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kiln={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn run_joins_request_words() {
        let cli = Cli::try_parse_from([
            "kiln", "run", "--skill", "coder", "first", "10", "fibonacci", "numbers",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                skill,
                request,
                json,
            } => {
                assert_eq!(skill, "coder");
                assert!(!json);
                assert_eq!(request.join(" "), "first 10 fibonacci numbers");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_request() {
        assert!(Cli::try_parse_from(["kiln", "run", "--skill", "coder"]).is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["kiln", "tools", "--config", "/tmp/kiln.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/kiln.toml")));
    }

    #[test]
    fn default_config_renders_as_toml() {
        let config = kiln_config::load_and_validate_str("").unwrap();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[runtime]"));
        assert!(rendered.contains("max_retries = 3"));
    }
}
