use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use psyche_dialogue::{
    ConsciousDialogueService, DialogueClient, HttpDialogueClient, InMemoryPlayerStore,
    KeywordMemoryService, PsycheConfig, ScriptedDialogueClient, TurnContext,
};
use psyche_persona::Player;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "psyche-turn", version, about = "Runs one conscious dialogue turn")]
struct Cli {
    /// TOML configuration; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Player id.
    #[arg(long, default_value = "demo")]
    player: String,
    /// JSON player record to start from.
    #[arg(long)]
    player_file: Option<PathBuf>,
    /// What the player says.
    #[arg(long)]
    prompt: String,
    /// Extra context forwarded with the prompt.
    #[arg(long)]
    context: Option<String>,
    /// Answer with the scripted client instead of the remote API.
    #[arg(long)]
    offline: bool,
}

fn load_player(cli: &Cli) -> Result<Player> {
    let Some(path) = &cli.player_file else {
        return Ok(Player::new(&cli.player, &cli.player));
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading player file {}", path.display()))?;
    let mut player: Player =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    player.id.clone_from(&cli.player);
    Ok(player)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PsycheConfig::load(path)?,
        None => PsycheConfig::default(),
    };

    let client: Arc<dyn DialogueClient> = if cli.offline {
        Arc::new(ScriptedDialogueClient::default())
    } else {
        let Ok(api_key) = env::var(&config.dialogue.api_key_env) else {
            bail!(
                "{} is not set; pass --offline to use the scripted client",
                config.dialogue.api_key_env
            );
        };
        Arc::new(HttpDialogueClient::new(
            config.dialogue.endpoint.clone(),
            Some(api_key),
            config.dialogue.turn_timeout(),
        )?)
    };

    let store = Arc::new(InMemoryPlayerStore::new());
    store.insert(load_player(&cli)?);
    let service = ConsciousDialogueService::from_config(
        &config,
        client,
        store.clone(),
        Arc::new(KeywordMemoryService::default()),
    )?;
    service.start_background();

    let context = cli.context.clone().map(TurnContext::text).unwrap_or_default();
    let result = service
        .generate_response(&cli.player, &cli.prompt, &context)
        .await
        .context("dialogue turn failed");
    service.shutdown().await;
    let response = result?;
    info!(
        turn = response.turn_number,
        awareness = response.consciousness.awareness_level,
        "turn finished"
    );
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
