use super::*;

use teloxide::net::Download;
use teloxide::types::{InputFile, MessageId, ParseMode};

pub(super) fn load_config(path: &Path) -> Result<Config> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config(&contents, config_dir)
}

pub(super) fn parse_config(contents: &str, config_dir: &Path) -> Result<Config> {
    let config_file: ConfigFile = toml::from_str(contents).context("parse config")?;
    let token = resolve_token(config_file.token, config_dir)?;
    let default_language = match config_file.default_language.as_deref() {
        Some(code) => Language::from_code(code)
            .ok_or_else(|| anyhow!("unsupported default_language {:?}", code))?,
        None => Language::default(),
    };
    let reference_url = match config_file.reference_url {
        Some(url) if url.trim().is_empty() => None,
        Some(url) => Some(url),
        None => Some(DEFAULT_REFERENCE_URL.to_string()),
    };
    Ok(Config {
        token,
        dictionaries_dir: resolve_relative_path(&config_file.dictionaries_dir, config_dir),
        data_dir: resolve_relative_path(&config_file.data_dir, config_dir),
        default_language,
        reference_url,
    })
}

pub(super) fn resolve_token(input: TokenInput, config_dir: &Path) -> Result<String> {
    let token = match input {
        TokenInput::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(anyhow!("token is empty"));
            }
            // Bot tokens always carry a colon; anything else names a file.
            if trimmed.contains(':') {
                trimmed.to_string()
            } else {
                read_token_file(&resolve_relative_path(Path::new(trimmed), config_dir))?
            }
        }
        TokenInput::File { file } => read_token_file(&resolve_relative_path(&file, config_dir))?,
    };
    if token.is_empty() {
        return Err(anyhow!("token is empty"));
    }
    Ok(token)
}

pub(super) fn read_token_file(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read token file {}", path.display()))?;
    Ok(contents.trim().to_string())
}

pub(super) fn resolve_relative_path(path: &Path, config_dir: &Path) -> PathBuf {
    if path.is_relative() {
        config_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

pub(super) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(data).context("write temp file")?;
    tmp.flush().context("flush temp file")?;
    tmp.as_file_mut().sync_all().context("sync temp file")?;
    tmp.persist(path)
        .map_err(|e| anyhow!("persist temp file: {}", e))?;
    Ok(())
}

pub(super) fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

pub(super) fn split_words(text: &str) -> Vec<String> {
    normalize_line_endings(text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub(super) fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    let cmd = first.trim_start_matches('/');
    Some(cmd.split('@').next().unwrap_or(cmd))
}

// Accepts a bare `<name>.txt` filename. Anything that could escape the
// dictionaries directory is refused.
pub(super) fn sanitize_dictionary_name(input: &str) -> Option<String> {
    let name = input.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return None;
    }
    if !has_dictionary_ext(Path::new(name)) {
        return None;
    }
    let stem = &name[..name.len() - DICTIONARY_EXT.len() - 1];
    if stem.trim().is_empty() || stem.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

pub(super) fn has_dictionary_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DICTIONARY_EXT))
        .unwrap_or(false)
}

pub(super) fn display_name(name: &str) -> &str {
    let len = name.len();
    let ext_len = DICTIONARY_EXT.len() + 1;
    if len > ext_len && has_dictionary_ext(Path::new(name)) {
        &name[..len - ext_len]
    } else {
        name
    }
}

pub(super) fn chat_id_from_user_id(user_id: u64) -> ChatId {
    ChatId(user_id as i64)
}

pub(super) fn is_message_not_modified_error(err: &teloxide::RequestError) -> bool {
    err.to_string()
        .to_ascii_lowercase()
        .contains("message is not modified")
}

pub(super) async fn download_telegram_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let mut out = Vec::new();
    bot.download_file(&file.path, &mut out).await?;
    Ok(out)
}

// Sends replies in order. When `edit` is set, the first text reply
// replaces that message instead of posting a new one.
pub(super) async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    mut edit: Option<MessageId>,
    replies: Vec<Reply>,
) -> Result<()> {
    for reply in replies {
        match reply {
            Reply::Text { text, keyboard } => {
                if let Some(message_id) = edit.take() {
                    let mut request = bot
                        .edit_message_text(chat_id, message_id, text.clone())
                        .parse_mode(ParseMode::Html);
                    if let Some(keyboard) = keyboard.clone() {
                        request = request.reply_markup(keyboard);
                    }
                    match request.await {
                        Ok(_) => continue,
                        Err(err) if is_message_not_modified_error(&err) => continue,
                        Err(err) => warn!("edit message failed, sending instead: {}", err),
                    }
                }
                let mut request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await?;
            }
            Reply::Document { file_name, bytes } => {
                bot.send_document(chat_id, InputFile::memory(bytes).file_name(file_name))
                    .await?;
            }
        }
    }
    Ok(())
}

pub(super) async fn send_error(bot: &Bot, chat_id: ChatId, state: &AppState, user_id: u64) {
    let language = state.dialogue.language_for(user_id);
    let text = state
        .dialogue
        .formatter(language)
        .t("error-generic");
    if let Err(err) = bot.send_message(chat_id, text).await {
        error!("send error notice failed: {}", err);
    }
}
