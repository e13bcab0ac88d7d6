//! Run GLM nodes from the command line.
//!
//! Reads the API key from `--api-key`, the `ZHIPUAI_API_KEY` environment
//! variable, or `config.json` under the root directory (`--root`, else
//! `GLM_NODES_HOME`, else the current directory).
//!
//! # Examples
//!
//! ```sh
//! # List node definitions (input schemas, presets, output names)
//! glm-nodes list
//!
//! # Expand a video prompt with the default system prompt
//! glm-nodes chat --text "a puppy playing on the grass"
//!
//! # Pick a preset from prompts/text_chat.json
//! glm-nodes chat --text "city at night" --preset cinematic
//!
//! # Describe an image
//! glm-nodes vision --image-url https://example.com/cat.jpg
//!
//! # Translate, with languages from the flags or config.json
//! glm-nodes translate --text "你好，世界" --target ja
//!
//! # Raw node invocation with host-style JSON inputs
//! glm-nodes run GLM_Text_Chat --inputs @inputs.json
//! ```

use clap::{Parser, Subcommand};
use glm_nodes::api::ZhipuConnector;
use glm_nodes::config::NodePaths;
use glm_nodes::nodes::{
    NodeContext, NodeSet, TextChatNode, TranslateNode, VisionNode, text_chat, translate, vision,
};
use glm_nodes::prompt::PromptProfile;
use serde_json::{Map, Value};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run Zhipu GLM text, vision, and translation nodes.
#[derive(Parser)]
#[command(name = "glm-nodes")]
struct Cli {
    /// Root directory holding config.json and prompts/
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Chat completions endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every node definition as JSON
    List,

    /// List the effective presets of a node, default selection first
    Presets {
        /// Node name or prompt key (text_chat, vision, translate)
        node: String,
    },

    /// Run a node with raw JSON inputs
    Run {
        /// Node name, e.g. GLM_Text_Chat
        node: String,
        /// JSON object, `@path` to read a file, or `-` for stdin
        #[arg(long, default_value = "{}")]
        inputs: String,
    },

    /// Text chat with a resolved system prompt
    Chat {
        /// User text (`-` reads stdin)
        #[arg(long)]
        text: String,
        /// System prompt override
        #[arg(long)]
        system: Option<String>,
        #[arg(long)]
        preset: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        top_p: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Generate a prompt from an image
    Vision {
        #[arg(long)]
        image_url: Option<String>,
        /// Base64 image data or data URI (`@path` reads a file)
        #[arg(long)]
        image_base64: Option<String>,
        /// Prompt override
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        preset: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },

    /// Translate text
    Translate {
        /// Text to translate (`-` reads stdin)
        #[arg(long)]
        text: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// System prompt override
        #[arg(long)]
        system: Option<String>,
        #[arg(long)]
        preset: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn read_stdin_content() -> Result<String, String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(buf)
}

/// `-` reads stdin, `@path` reads a file, anything else is literal.
fn read_arg_value(value: &str) -> Result<String, String> {
    if value == "-" {
        read_stdin_content()
    } else if let Some(path) = value.strip_prefix('@') {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read '{path}': {e}"))
    } else {
        Ok(value.to_string())
    }
}

/// Accept either the node name or its prompt key.
fn canonical_node_name(node: &str) -> &str {
    match node {
        text_chat::PROMPT_KEY => text_chat::NAME,
        vision::PROMPT_KEY => vision::NAME,
        translate::PROMPT_KEY => translate::NAME,
        other => other,
    }
}

fn prompt_profile_for(ctx: &Arc<NodeContext>, node: &str) -> Option<PromptProfile> {
    match canonical_node_name(node) {
        text_chat::NAME => Some(TextChatNode::new(ctx.clone()).prompt_profile()),
        vision::NAME => Some(VisionNode::new(ctx.clone()).prompt_profile()),
        translate::NAME => Some(TranslateNode::new(ctx.clone()).prompt_profile()),
        _ => None,
    }
}

/// JSON inputs object, skipping unset flags so node defaults apply.
#[derive(Default)]
struct InputsBuilder(Map<String, Value>);

impl InputsBuilder {
    fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    fn set_opt<T: Into<Value>>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    fn build(self) -> String {
        Value::Object(self.0).to_string()
    }
}

/// Translate the subcommand into `(node name, JSON inputs)`.
fn node_invocation(command: Command) -> Result<(String, String), String> {
    match command {
        Command::Run { node, inputs } => {
            Ok((canonical_node_name(&node).to_string(), read_arg_value(&inputs)?))
        }
        Command::Chat {
            text,
            system,
            preset,
            api_key,
            model,
            temperature,
            top_p,
            max_tokens,
        } => {
            let inputs = InputsBuilder::default()
                .set("text_input", read_arg_value(&text)?)
                .set_opt("system_prompt_override", system)
                .set_opt("preset", preset)
                .set_opt("api_key", api_key)
                .set_opt("model_name", model)
                .set_opt("temperature", temperature)
                .set_opt("top_p", top_p)
                .set_opt("max_tokens", max_tokens)
                .build();
            Ok((text_chat::NAME.to_string(), inputs))
        }
        Command::Vision {
            image_url,
            image_base64,
            prompt,
            preset,
            api_key,
            model,
        } => {
            let image_base64 = image_base64.map(|v| read_arg_value(&v)).transpose()?;
            let inputs = InputsBuilder::default()
                .set_opt("image_url", image_url)
                .set_opt("image_base64", image_base64)
                .set_opt("prompt", prompt)
                .set_opt("preset", preset)
                .set_opt("api_key", api_key)
                .set_opt("model_name", model)
                .build();
            Ok((vision::NAME.to_string(), inputs))
        }
        Command::Translate {
            text,
            source,
            target,
            system,
            preset,
            api_key,
            model,
            temperature,
            max_tokens,
        } => {
            let inputs = InputsBuilder::default()
                .set("text", read_arg_value(&text)?)
                .set_opt("source_lang", source)
                .set_opt("target_lang", target)
                .set_opt("system_prompt_override", system)
                .set_opt("preset", preset)
                .set_opt("api_key", api_key)
                .set_opt("model_name", model)
                .set_opt("temperature", temperature)
                .set_opt("max_tokens", max_tokens)
                .build();
            Ok((translate::NAME.to_string(), inputs))
        }
        Command::List | Command::Presets { .. } => Err("not a node invocation".to_string()),
    }
}

async fn run(cli: Cli) -> Result<String, String> {
    let paths = match cli.root {
        Some(root) => NodePaths::new(root),
        None => NodePaths::from_env(),
    };
    let connector = match cli.endpoint {
        Some(url) => ZhipuConnector::with_url(url),
        None => ZhipuConnector::new(),
    };
    let ctx = Arc::new(NodeContext::new(paths, Arc::new(connector)));
    let nodes = NodeSet::new().with_glm_nodes(ctx.clone());

    match cli.command {
        Command::List => serde_json::to_string_pretty(&nodes.definitions())
            .map_err(|e| format!("failed to serialize node definitions: {e}")),
        Command::Presets { node } => {
            let profile = prompt_profile_for(&ctx, &node)
                .ok_or_else(|| format!("unknown node '{node}'"))?;
            let catalog = profile.load_catalog();
            let listing: Vec<String> = catalog
                .iter()
                .map(|(name, body)| format!("{name}\t{}", body.lines().next().unwrap_or("")))
                .collect();
            Ok(listing.join("\n"))
        }
        command => {
            let (node, inputs) = node_invocation(command)?;
            nodes
                .try_execute(&node, &inputs)
                .await
                .map_err(|e| e.to_string())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
