use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

mod callback_handlers;
mod dialogue;
mod helpers;
mod i18n;
mod message_handlers;
mod render;
mod session_store;
mod word_store;


use callback_handlers::handle_callback;
use dialogue::{Dialogue, Event};
use helpers::*;
use i18n::{Language, Localizer};
use message_handlers::handle_message;
use render::Reply;
use session_store::{JsonFileBackend, SessionStore};
use word_store::WordStore;

// Word lists with more entries than this are sent as a file attachment.
const INLINE_WORD_LIMIT: usize = 10;
// Telegram rejects callback data longer than this.
const MAX_CALLBACK_DATA_LEN: usize = 64;
const BATCH_SIZES: [usize; 3] = [5, 10, 15];
const DICTIONARY_EXT: &str = "txt";
const DEFAULT_REFERENCE_URL: &str = "https://{lang}.wiktionary.org/wiki/{word}";

#[derive(Debug, Clone)]
struct Config {
    token: String,
    dictionaries_dir: PathBuf,
    data_dir: PathBuf,
    default_language: Language,
    reference_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    token: TokenInput,
    dictionaries_dir: PathBuf,
    data_dir: PathBuf,
    #[serde(default)]
    default_language: Option<String>,
    #[serde(default)]
    reference_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenInput {
    String(String),
    File { file: PathBuf },
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: PathBuf,
}

struct AppState {
    dialogue: Dialogue,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    fs::create_dir_all(&config.data_dir).context("create data_dir")?;

    let words = WordStore::new(config.dictionaries_dir.clone());
    let available = words.list_dictionaries()?;
    info!(
        "serving {} dictionaries from {}",
        available.len(),
        config.dictionaries_dir.display()
    );

    let sessions = SessionStore::open(Box::new(JsonFileBackend::new(
        config.data_dir.join("sessions.json"),
    )));
    let texts = Localizer::new(config.default_language)?;
    let dialogue = Dialogue::new(words, sessions, texts, config.reference_url.clone());

    let state = Arc::new(AppState { dialogue });

    let bot = Bot::new(config.token.clone());

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    info!("starting bot");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
