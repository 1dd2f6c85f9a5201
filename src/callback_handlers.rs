use super::*;

pub(super) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> Result<()> {
    let user_id = q.from.id.0;
    let data = q.data.clone();
    let (chat_id, message_id) = match q.message.as_ref() {
        Some(message) => (message.chat.id, Some(message.id)),
        None => (chat_id_from_user_id(user_id), None),
    };

    // Answer first so the client stops its spinner even if handling fails.
    if let Err(err) = bot.answer_callback_query(q.id).await {
        warn!("answer callback query for user {} failed: {}", user_id, err);
    }

    let Some(data) = data else {
        return Ok(());
    };

    let worker = state.clone();
    let outcome =
        tokio::task::spawn_blocking(move || worker.dialogue.handle(user_id, Event::Button(data)))
            .await
            .context("dialogue task failed")
            .and_then(|result| result);
    let replies = match outcome {
        Ok(replies) => replies,
        Err(err) => {
            error!("handling button from user {} failed: {:#}", user_id, err);
            send_error(&bot, chat_id, &state, user_id).await;
            return Ok(());
        }
    };

    if let Err(err) = deliver(&bot, chat_id, message_id, replies).await {
        error!("replying to user {} failed: {:#}", user_id, err);
    }
    Ok(())
}
