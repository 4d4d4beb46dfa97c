use crate::format;
use crate::lookup::{self, Reply, Services};
use reqwest::Client;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{ChatAction, InputFile, ParseMode, ReplyParameters},
    utils::command::BotCommands,
};

/// Лимит подписи к фото в Telegram (UTF-16 единицы).
const CAPTION_LIMIT: usize = 1024;

/* ====== Команды ====== */
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Команды:")]
pub enum Command {
    #[command(description = "приступить к работе")]
    Start,
    #[command(description = "показать способности")]
    Help,
    #[command(description = "статистика поисковых запросов")]
    Stats,
    #[command(description = "история поисковых запросов")]
    History,
}

pub async fn run(bot: Bot, services: Services, http: Client) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    let handler = dptree::entry().branch(
        Update::filter_message()
            .branch(dptree::entry().filter_command::<Command>().endpoint(on_command))
            .branch(dptree::endpoint(on_search_text)),
    );

    tracing::info!("bot started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![services, http])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_command(bot: Bot, msg: Message, cmd: Command, services: Services) -> ResponseResult<()> {
    tracing::info!(chat_id = msg.chat.id.0, ?cmd, "command");
    let text = match cmd {
        Command::Start => format!("{}{}", format::say_hello(), format::functions()),
        Command::Help => format::functions().to_string(),
        Command::Stats => {
            let Some(user_id) = sender_id(&msg) else { return Ok(()) };
            lookup::stats_text(&services, user_id).await
        }
        Command::History => {
            let Some(user_id) = sender_id(&msg) else { return Ok(()) };
            lookup::history_text(&services, user_id).await
        }
    };
    reply_text(&bot, &msg, text).await
}

/* ====== Поиск по тексту ====== */
async fn on_search_text(bot: Bot, msg: Message, services: Services, http: Client) -> ResponseResult<()> {
    let Some(user_id) = sender_id(&msg) else { return Ok(()) };
    let Some(query) = message_text_any(&msg) else { return Ok(()) };
    let query = query.trim();
    if query.is_empty() {
        return Ok(());
    }
    tracing::info!(user_id, query, "movie request");

    bot.send_chat_action(msg.chat.id, ChatAction::UploadPhoto).await?;
    match lookup::lookup_movie(&services, user_id, query, msg.date.timestamp()).await {
        Reply::Text(text) => reply_text(&bot, &msg, text).await,
        Reply::Card { caption, picture_url } => send_card(&bot, &msg, &http, caption, &picture_url).await,
    }
}

/// Фото с карточкой в подписи; если подпись не влезает, карточка уходит
/// отдельным сообщением. Без картинки шлём хотя бы текст.
async fn send_card(
    bot: &Bot,
    msg: &Message,
    http: &Client,
    caption: String,
    picture_url: &str,
) -> ResponseResult<()> {
    let bytes = match fetch_image(http, picture_url).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(picture_url, error = %e, "poster download failed");
            return reply_text(bot, msg, caption).await;
        }
    };
    let photo = InputFile::memory(bytes).file_name("poster.jpg");
    let fits = format::utf16_len(&caption) <= CAPTION_LIMIT;

    let mut request = bot
        .send_photo(msg.chat.id, photo)
        .reply_parameters(ReplyParameters::new(msg.id));
    if fits {
        request = request.caption(caption.clone()).parse_mode(ParseMode::Html);
    }
    request.await?;
    if !fits {
        for part in format::split_message(&caption, format::MESSAGE_LIMIT) {
            bot.send_message(msg.chat.id, part).parse_mode(ParseMode::Html).await?;
        }
    }
    Ok(())
}

/* ====== Вспомогательные ====== */

/// Ответ на сообщение; длинный текст уходит несколькими сообщениями,
/// ответом помечается только первое.
async fn reply_text(bot: &Bot, msg: &Message, text: String) -> ResponseResult<()> {
    for (i, part) in format::split_message(&text, format::MESSAGE_LIMIT).into_iter().enumerate() {
        let request = bot.send_message(msg.chat.id, part).parse_mode(ParseMode::Html);
        if i == 0 {
            request.reply_parameters(ReplyParameters::new(msg.id)).await?;
        } else {
            request.await?;
        }
    }
    Ok(())
}

fn sender_id(msg: &Message) -> Option<u64> {
    msg.from.as_ref().map(|u| u.id.0)
}

fn message_text_any(msg: &Message) -> Option<&str> {
    msg.text().or_else(|| msg.caption())
}

/* ====== Загрузка постера байтами: Telegram сам по URL берёт только до 5 МБ ====== */
async fn fetch_image(http: &Client, url: &str) -> Result<Vec<u8>, teloxide::RequestError> {
    let resp = http
        .get(url)
        .header(reqwest::header::ACCEPT, "image/*")
        .timeout(std::time::Duration::from_secs(15))
        .send()
        .await
        .map_err(to_req_err)?;
    if !resp.status().is_success() {
        return Err(to_req_err(format!("status {}", resp.status())));
    }
    if let Some(ct) = resp.headers().get(reqwest::header::CONTENT_TYPE) {
        let ct = ct.to_str().unwrap_or("");
        if !ct.starts_with("image/") {
            return Err(to_req_err(format!("unexpected content-type: {ct}")));
        }
    }
    let bytes = resp.bytes().await.map_err(to_req_err)?;
    Ok(bytes.to_vec())
}

fn to_req_err<E: std::fmt::Display>(e: E) -> teloxide::RequestError {
    teloxide::RequestError::Io(std::sync::Arc::new(std::io::Error::other(e.to_string())))
}
