//! stepmcp demo
//!
//! Calls the built-in tools in-process and prints the notifications a client
//! would receive. Logs go to stderr; results and notifications to stdout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use stepmcp_core::{
    Content, CreateMessageRequest, CreateMessageResult, McpResult, Role, Sampler,
    ServerNotification,
};
use stepmcp_server::{LoggingConfig, Server, ServerConfig, ToolArguments};
use tracing::info;

/// Command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "stepmcp-demo",
    version,
    about = "Run the stepmcp built-in tools locally and watch their notifications"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short = 'c', global = true, env = "STEPMCP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level for stderr output
    #[arg(long, short = 'l', global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the registered tools
    List,

    /// Call a tool
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(long, short = 'a', default_value = "{}")]
        arguments: String,

        /// Send a progress token with the request
        #[arg(long, short = 'p')]
        progress_token: Option<String>,

        /// Answer sampling requests by echoing the prompt
        #[arg(long)]
        echo_sampling: bool,

        /// Override the longRunning step delay (milliseconds)
        #[arg(long)]
        step_delay_ms: Option<u64>,
    },
}

/// Stand-in for a client model: answers with the prompt it was given.
#[derive(Debug)]
struct EchoSampler;

#[async_trait]
impl Sampler for EchoSampler {
    async fn create_message(&self, request: CreateMessageRequest) -> McpResult<CreateMessageResult> {
        let prompt = request
            .messages
            .iter()
            .filter_map(|m| m.content.as_text())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(CreateMessageResult {
            role: Role::Assistant,
            content: Content::text(format!("(echo) {}", prompt)),
            model: "echo".to_string(),
            stop_reason: Some("endTurn".to_string()),
        })
    }
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.logging = LoggingConfig {
        level: cli.log_level.clone(),
        ..config.logging
    };
    Ok(config)
}

fn print_notification(notification: &ServerNotification) -> Result<()> {
    let line = serde_json::json!({
        "jsonrpc": "2.0",
        "method": notification.method(),
        "params": match notification {
            ServerNotification::Progress(p) => serde_json::to_value(p)?,
            ServerNotification::Message(m) => serde_json::to_value(m)?,
        },
    });
    println!("{}", line);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    if let Commands::Call {
        step_delay_ms: Some(ms),
        ..
    } = &cli.command
    {
        config.long_running.step_delay_ms = *ms;
    }

    let _guard = config.logging.init().context("initializing logging")?;
    let server = Server::builder().config(config).build()?;

    match cli.command {
        Commands::List => {
            for tool in server.list_tools() {
                println!("{:<18} {}", tool.name, tool.description);
                for arg in &tool.arguments {
                    let note = match (&arg.default, arg.required) {
                        (Some(default), _) => format!(" (default: {})", default),
                        (None, true) => " (required)".to_string(),
                        (None, false) => String::new(),
                    };
                    println!("    {:<14} {}{}", arg.name, arg.description, note);
                }
            }
        }
        Commands::Call {
            name,
            arguments,
            progress_token,
            echo_sampling,
            ..
        } => {
            let args: serde_json::Value =
                serde_json::from_str(&arguments).context("--arguments must be JSON")?;
            if !args.is_object() {
                bail!("--arguments must be a JSON object");
            }

            let (mut ctx, mut notifications) = server.request_context("demo-1");
            if let Some(token) = progress_token {
                ctx = ctx.with_progress_token(token);
            }
            if echo_sampling {
                ctx = ctx.with_sampler(Arc::new(EchoSampler));
            }

            let printer = tokio::spawn(async move {
                while let Some(notification) = notifications.recv().await {
                    print_notification(&notification)?;
                }
                anyhow::Ok(())
            });

            info!(tool = %name, "Calling tool");
            let call = server.call_tool(&name, ToolArguments::try_from(args)?, ctx);
            let result = tokio::select! {
                result = call => result,
                _ = tokio::signal::ctrl_c() => {
                    server.shutdown();
                    bail!("interrupted");
                }
            };
            // The context (and its sender) is gone once the call returns.
            tokio::time::timeout(Duration::from_secs(1), printer)
                .await
                .context("notification printer stalled")???;

            let result = result?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    server.shutdown();
    Ok(())
}
