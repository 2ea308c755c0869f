use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use bench_runner::{bundle_traces, BenchmarkSuite, RunLimits, SuiteConfig, DIFFICULTY_LEVELS};

#[derive(Parser)]
#[command(name = "fbench", version = "0.1.0", about = "Service-fallback benchmark for tool-using agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderArg {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "anthropic")]
    Anthropic,
    #[value(name = "google")]
    Google,
}

impl ProviderArg {
    fn as_str(self) -> &'static str {
        match self {
            ProviderArg::OpenAi => "openai",
            ProviderArg::Anthropic => "anthropic",
            ProviderArg::Google => "google",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark sweep against a model provider.
    Run {
        #[arg(long, value_enum, default_value = "openai")]
        provider: ProviderArg,
        /// Model override (defaults to the provider's default model).
        #[arg(long)]
        model: Option<String>,
        /// Run only this scenario (e.g. code_hosting_create_issue).
        #[arg(long)]
        scenario: Option<String>,
        /// Run only scenarios for one server pair (e.g. code_hosting).
        #[arg(long)]
        server: Option<String>,
        /// Run only one difficulty level.
        #[arg(long)]
        level: Option<String>,
        /// Show full tool call traces in the console.
        #[arg(long)]
        verbose: bool,
        /// Save per-run conversation traces to this directory.
        #[arg(long, value_name = "DIR")]
        trace: Option<PathBuf>,
        /// Prompts file overriding the built-in scenario prompts.
        #[arg(long, value_name = "FILE")]
        prompts: Option<PathBuf>,
    },
    /// List the available scenarios and their categories.
    Scenarios,
    /// Validate a prompts file against the embedded schema.
    ValidatePrompts {
        file: PathBuf,
    },
    /// Zip a directory of saved traces for sharing.
    Bundle {
        trace_dir: PathBuf,
        #[arg(long, default_value = "traces.zip")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Commands::Run {
            provider,
            model,
            scenario,
            server,
            level,
            verbose,
            trace,
            prompts,
        } => run_benchmark(provider, model, scenario, server, level, verbose, trace, prompts),
        Commands::Scenarios => {
            for spec in bench_registry::SCENARIOS {
                println!("{:<30} {}", spec.id, spec.category.as_str());
            }
            Ok(())
        }
        Commands::ValidatePrompts { file } => validate_prompts(&file),
        Commands::Bundle { trace_dir, out } => {
            bundle_traces(&trace_dir, &out)?;
            println!("bundle written: {}", out.display());
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_benchmark(
    provider: ProviderArg,
    model: Option<String>,
    scenario: Option<String>,
    server: Option<String>,
    level: Option<String>,
    verbose: bool,
    trace: Option<PathBuf>,
    prompts: Option<PathBuf>,
) -> Result<()> {
    let provider = provider.as_str();
    let model = match model {
        Some(model) => model,
        None => bench_providers::default_model(provider)
            .ok_or_else(|| anyhow!("no default model for provider {provider}"))?
            .to_string(),
    };

    let scenarios: Vec<String> = if let Some(scenario) = scenario {
        if bench_registry::scenario(&scenario).is_none() {
            return Err(anyhow!("unknown scenario: {scenario}"));
        }
        vec![scenario]
    } else if let Some(server) = server {
        let category = bench_registry::Category::parse(&server)
            .ok_or_else(|| anyhow!("unknown server pair: {server}"))?;
        bench_registry::SCENARIOS
            .iter()
            .filter(|spec| spec.category == category)
            .map(|spec| spec.id.to_string())
            .collect()
    } else {
        bench_registry::scenario_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    };

    let levels: Vec<String> = match level {
        Some(level) => {
            if !DIFFICULTY_LEVELS.contains(&level.as_str()) {
                return Err(anyhow!("unknown level: {level}"));
            }
            vec![level]
        }
        None => DIFFICULTY_LEVELS.iter().map(|l| l.to_string()).collect(),
    };

    let prompts = load_prompts(prompts)?;

    let config = SuiteConfig {
        provider: provider.to_string(),
        model: model.clone(),
        scenarios,
        levels,
        limits: RunLimits::default(),
        verbose,
        trace_dir: trace,
        prompts,
    };
    let mut suite = BenchmarkSuite::new(config);
    suite.run_all(|| bench_providers::adapter_from_env(provider, &model))?;
    Ok(())
}

fn load_prompts(path: Option<PathBuf>) -> Result<Value> {
    let prompts = match path {
        Some(path) => {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        }
        None => bench_registry::builtin_prompts()?,
    };
    let schema = bench_schemas::compile_schema("prompts.schema.json")?;
    if let Err(errors) = schema.validate(&prompts) {
        let details: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(anyhow!("prompts file invalid: {}", details.join("; ")));
    }
    Ok(prompts)
}

fn validate_prompts(file: &PathBuf) -> Result<()> {
    load_prompts(Some(file.clone()))?;
    println!("prompts ok: {}", file.display());
    Ok(())
}
