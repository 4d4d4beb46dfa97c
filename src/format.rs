use crate::models::{Movie, UserHistory, UserStats};
use chrono::DateTime;

/// Сколько последних записей показываем в /stats и /history.
pub const SHOWN_ENTRIES: usize = 80;
/// Лимит текста сообщения в Telegram (в UTF-16 единицах).
pub const MESSAGE_LIMIT: usize = 4096;

pub fn say_hello() -> &'static str {
    "Привет, я Бэбработ! 👋 \n\n"
}

pub fn search_failed() -> &'static str {
    "Не удалось найти киношку 💔"
}

pub fn quota_exceeded() -> &'static str {
    "Лимит запросов к базе фильмов исчерпан, попробуй позже ⏳"
}

pub fn storage_unavailable() -> &'static str {
    "Не получилось достать историю запросов, попробуй позже 🙈"
}

pub fn no_requests_were_made() -> &'static str {
    "Запросов по поиску фильмов пока не было 👺\n\nДавай что-нибудь подберём 🔍"
}

pub fn functions() -> &'static str {
    "🤓 Бэбработ умеет\n\n\
     👉 искать информацию о киношках по названию\n\
     👉 /start приступать к работе\n\
     👉 /help показывать свои способности\n\
     👉 /stats показывать статистику по поисковым запросам\n\
     👉 /history показывать историю поисковых запросов"
}

/// Вступление с учётом склонения: 1 запрос, 2–4 запроса, иначе запросов.
pub fn requests_intro(num_requests: u64) -> String {
    match num_requests {
        1 => format!("Был выполнен всего {num_requests} запрос 😢\n"),
        2..=4 => format!("Всего было выполнено {num_requests} поисковых запроса 😉\n"),
        _ => format!("Всего было выполнено {num_requests} поисковых запросов 🤯\n"),
    }
}

pub fn user_stats(stats: &UserStats) -> String {
    if stats.num_requests == 0 {
        return no_requests_were_made().to_string();
    }
    let lines: Vec<String> = last(&stats.requested_movies)
        .iter()
        .map(|(movie, amount)| format!("🎬 {} {}", html_escape(movie), amount))
        .collect();
    format!(
        "{}\n<i>Искомые киношки:</i>\n{}\n\nПохоже, тебе нравится {} 💫",
        requests_intro(stats.num_requests),
        lines.join("\n"),
        html_escape(&stats.favourite_movie)
    )
}

pub fn user_history(history: &UserHistory) -> String {
    if history.num_requests == 0 {
        return no_requests_were_made().to_string();
    }
    let lines: Vec<String> = last(&history.requests)
        .iter()
        .map(|(date, movie)| format!("🎞 {} {}", format_date(*date), html_escape(movie)))
        .collect();
    format!(
        "{}\n<i>Искомые киношки:</i>\n{}",
        requests_intro(history.num_requests),
        lines.join("\n")
    )
}

pub fn movie_card(movie: &Movie) -> String {
    let genres = movie.genres.iter().map(|g| html_escape(g)).collect::<Vec<_>>().join(", ");
    format!(
        "🍿 <b>{}</b> \n\
         \n👉 Жанр: {}\
         \n👉 Рейтинг на Кинопоиске: {:.1}\
         \n👉 Описание: {}\
         \n👉 Ссылка на просмотр: {}\
         \n👉 Ещё одна: {}",
        html_escape(&movie.name),
        genres,
        movie.rating,
        html_escape(&movie.description),
        html_escape(&movie.crafted_link),
        html_escape(&movie.google_link),
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Режет текст на части не длиннее `limit` UTF-16 единиц по границам строк,
/// чтобы HTML-разметка внутри строки не рвалась. Слишком длинная строка
/// режется посимвольно.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut chunk_len = 0;
    for line in text.split('\n') {
        let len = utf16_len(line);
        if !chunk.is_empty() && chunk_len + 1 + len > limit {
            parts.push(chunk.join("\n"));
            chunk.clear();
            chunk_len = 0;
        }
        if len > limit {
            parts.extend(split_line(line, limit));
            continue;
        }
        chunk_len = if chunk.is_empty() { len } else { chunk_len + 1 + len };
        chunk.push(line);
    }
    if !chunk.is_empty() {
        parts.push(chunk.join("\n"));
    }
    let mut parts: Vec<String> = parts.into_iter().filter(|p| !p.trim().is_empty()).collect();
    if parts.is_empty() {
        parts.push(text.trim().to_string());
    }
    parts
}

fn split_line(line: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0;
    for ch in line.chars() {
        if cur_len + ch.len_utf16() > limit {
            out.push(std::mem::take(&mut cur));
            cur_len = 0;
        }
        cur.push(ch);
        cur_len += ch.len_utf16();
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Длина в тех единицах, которыми Telegram меряет лимиты.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

fn last<T>(items: &[T]) -> &[T] {
    &items[items.len().saturating_sub(SHOWN_ENTRIES)..]
}

fn format_date(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|d| d.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
