use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::agent::{GenerationSettings, ResponseGenerator};
use crate::config::Config;
use crate::conversation::{Conversation, Submission};
use crate::llm::OpenAiClient;
use crate::ui::{self, conversation::ConversationManager};

/// Build the reply generator for `config`. Fails when the API key is missing.
pub fn build_generator(config: &Config) -> Result<ResponseGenerator> {
    let client = OpenAiClient::from_config(config)?;
    info!(url = client.url(), model = %config.completion.model, "completion client ready");
    Ok(ResponseGenerator::new(
        Arc::new(client),
        GenerationSettings::from(&config.completion),
    ))
}

/// Open the full-screen chat view
pub async fn run_chat(config: Config) -> Result<()> {
    let generator = build_generator(&config)?;
    let manager = ConversationManager::new(Arc::new(generator), config.persona, config.ui);
    ui::app::run(manager).await
}

/// One exchange from the command line
pub async fn ask(config: &Config, message: &str, json: bool) -> Result<()> {
    if message.trim().is_empty() {
        bail!("Nothing to ask: the message is empty");
    }

    let generator = build_generator(config)?;
    let mut conversation = Conversation::new();
    match conversation.submit(message, &generator).await {
        Submission::Replied(reply) => {
            if json {
                let transcript = serde_json::to_string_pretty(conversation.messages())
                    .context("Failed to serialize conversation")?;
                println!("{}", transcript);
            } else {
                println!("{}", reply.content());
            }
            Ok(())
        }
        Submission::Rejected(reason) => bail!("Message not sent: {}", reason),
    }
}

/// Print the effective configuration, optionally writing the defaults first
pub fn show_config(config: &Config, path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("Config file already exists: {}", path.display());
        } else {
            Config::default().save(path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    let key_set = config.api_key().is_some();
    print!("{}", describe_config(config, path, key_set)?);
    Ok(())
}

/// Human-readable summary of `config`. Only whether the key is set is shown.
pub fn describe_config(config: &Config, path: &Path, key_set: bool) -> Result<String> {
    let body = toml::to_string_pretty(config).context("Failed to serialize config")?;
    let key_state = if key_set { "set" } else { "not set" };

    let mut out = String::new();
    out.push_str(&format!("# Config file: {}\n", path.display()));
    if !path.exists() {
        out.push_str("# (file not found, showing defaults)\n");
    }
    out.push_str(&format!(
        "# API key: ${} ({})\n\n",
        config.completion.api_key_env, key_state
    ));
    out.push_str(&body);
    Ok(out)
}
