// ABOUTME: Entry point for the agentpack binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and runs assemble, invoke or agents.

use std::fs;
use std::path::{Path, PathBuf};

use agentpack_bridge::{
    Bridge, BridgeMode, BridgeSettings, DiagnosticKind, ToolMessage, ToolParameters,
};
use agentpack_builder::{Assembler, BuildConfig};
use agentpack_core::AgentDescriptor;
use agentpack_store::DescriptorLog;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;

/// Package remote A2A agents as plugin tools and call them.
#[derive(Parser, Debug)]
#[command(name = "agentpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a plugin package from recorded agents plus a new batch.
    Assemble(AssembleArgs),

    /// Call a packaged tool and print each message as a JSON line.
    Invoke(InvokeArgs),

    /// List the agents recorded in the descriptor log.
    Agents(AgentsArgs),
}

#[derive(Args, Debug)]
struct AssembleArgs {
    /// Descriptor batch: a JSON array or one JSON object per line.
    #[arg(long, short)]
    descriptors: PathBuf,

    /// Where to write the package.
    #[arg(long, short)]
    output: PathBuf,

    /// Override AGENTPACK_TEMPLATE_DIR.
    #[arg(long)]
    template: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InvokeArgs {
    /// Tool name, e.g. agent0.
    tool: String,

    /// Directory searched for the tool's schema document.
    #[arg(long)]
    root: Option<PathBuf>,

    /// `direct` or `worker`.
    #[arg(long)]
    mode: Option<BridgeMode>,

    /// Tool parameter as key=value; repeatable.
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct AgentsArgs {
    /// Print full descriptors as JSON lines.
    #[arg(long)]
    json: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

/// Read a descriptor batch from a JSON array or JSON-lines file.
fn load_descriptors(path: &Path) -> anyhow::Result<Vec<AgentDescriptor>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()));
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parsing {} line {}", path.display(), i + 1))
        })
        .collect()
}

fn assemble(args: AssembleArgs) -> anyhow::Result<()> {
    let mut config = BuildConfig::from_env()?;
    if let Some(template) = args.template {
        config.template_dir = template;
    }

    let batch = load_descriptors(&args.descriptors)?;
    for descriptor in &batch {
        if let Err(e) = descriptor.validate() {
            tracing::warn!("{}", e);
        }
    }

    let mut assembler = Assembler::from_config(&config);
    let package = assembler.assemble(&batch)?;
    fs::write(&args.output, &package.bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    for failure in &package.failures {
        tracing::warn!("agent{} ({}) skipped: {}", failure.index, failure.agent_id, failure.error);
    }
    tracing::info!(
        "wrote {} ({} agents, {} bytes)",
        args.output.display(),
        package.agents,
        package.bytes.len()
    );
    Ok(())
}

async fn invoke(args: InvokeArgs) -> anyhow::Result<()> {
    let mut settings = BridgeSettings::from_env()?;
    if let Some(root) = args.root {
        settings.tool_root = root;
    }
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }

    let parameters: ToolParameters = args.params.into_iter().collect();
    let mut messages = Bridge::new(args.tool.as_str(), settings).invoke(parameters);

    let mut failure = None;
    while let Some(message) = messages.next().await {
        println!("{}", serde_json::to_string(&message)?);
        if let ToolMessage::Diagnostic { kind, text } = message
            && kind != DiagnosticKind::DecodeFailure
        {
            failure = Some(format!("{}: {}", kind, text));
        }
    }

    match failure {
        Some(reason) => anyhow::bail!("{} failed ({})", args.tool, reason),
        None => Ok(()),
    }
}

fn agents(args: AgentsArgs) -> anyhow::Result<()> {
    let config = BuildConfig::from_env()?;
    let replay = DescriptorLog::replay(&config.descriptor_log())?;

    for (index, descriptor) in replay.descriptors.iter().enumerate() {
        if args.json {
            println!("{}", serde_json::to_string(descriptor)?);
        } else {
            println!("agent{}\t{}\t{}", index, descriptor.id, descriptor.title);
        }
    }
    if replay.skipped > 0 {
        tracing::warn!("{} malformed line(s) skipped", replay.skipped);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("agentpack=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Assemble(args) => assemble(args),
        Command::Invoke(args) => invoke(args).await,
        Command::Agents(args) => agents(args),
    }
}
