use super::*;

pub(super) async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let user_id = match msg.from() {
        Some(user) => user.id.0,
        None => return Ok(()),
    };

    let event = match message_event(&bot, &msg).await {
        Ok(event) => event,
        Err(err) => {
            error!("reading message from user {} failed: {:#}", user_id, err);
            send_error(&bot, msg.chat.id, &state, user_id).await;
            return Ok(());
        }
    };

    let worker = state.clone();
    let outcome = tokio::task::spawn_blocking(move || worker.dialogue.handle(user_id, event))
        .await
        .context("dialogue task failed")
        .and_then(|result| result);
    let replies = match outcome {
        Ok(replies) => replies,
        Err(err) => {
            error!("handling message from user {} failed: {:#}", user_id, err);
            send_error(&bot, msg.chat.id, &state, user_id).await;
            return Ok(());
        }
    };

    if let Err(err) = deliver(&bot, msg.chat.id, None, replies).await {
        error!("replying to user {} failed: {:#}", user_id, err);
    }
    Ok(())
}

async fn message_event(bot: &Bot, msg: &Message) -> Result<Event> {
    if let Some(document) = msg.document() {
        let file_name = document.file_name.clone().unwrap_or_default();
        // Rejected by name anyway; skip the download.
        let bytes = if has_dictionary_ext(Path::new(&file_name)) {
            download_telegram_file(bot, &document.file.id)
                .await
                .with_context(|| format!("download {}", file_name))?
        } else {
            Vec::new()
        };
        return Ok(Event::Upload { file_name, bytes });
    }

    if is_media(msg) {
        return Ok(Event::Upload {
            file_name: String::new(),
            bytes: Vec::new(),
        });
    }

    let Some(text) = msg.text() else {
        return Ok(Event::Unsupported);
    };
    if let Some(cmd) = parse_command(text) {
        return Ok(Event::Command(cmd.to_ascii_lowercase()));
    }
    Ok(Event::Text(text.to_string()))
}

fn is_media(msg: &Message) -> bool {
    msg.photo().is_some()
        || msg.video().is_some()
        || msg.audio().is_some()
        || msg.voice().is_some()
        || msg.video_note().is_some()
        || msg.sticker().is_some()
        || msg.animation().is_some()
}
