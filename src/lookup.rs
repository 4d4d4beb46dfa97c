use crate::format;
use crate::kinopoisk::{KinopoiskClient, LookupError};
use crate::search::{LinkFinder, SearchError};
use crate::storage::UsageLog;
use std::sync::Arc;

/// Всё, что нужно обработчикам; передаётся в диспетчер как зависимость.
#[derive(Clone)]
pub struct Services {
    pub kinopoisk: KinopoiskClient,
    pub links: Arc<dyn LinkFinder>,
    pub log: Arc<dyn UsageLog>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Постер + подпись-карточка.
    Card { caption: String, picture_url: String },
    Text(String),
}

/// Полный цикл обработки названия фильма. В журнал пишем только найденный
/// фильм с картинкой.
pub async fn lookup_movie(services: &Services, user_id: u64, query: &str, date: i64) -> Reply {
    let mut movie = match services.kinopoisk.search_movie(query).await {
        Ok(m) => m,
        Err(LookupError::QuotaExceeded) => {
            tracing::warn!("metadata API quota exceeded");
            return Reply::Text(format::quota_exceeded().to_string());
        }
        Err(LookupError::NotFound) => {
            tracing::info!(user_id, query, "movie not found");
            return Reply::Text(format::search_failed().to_string());
        }
        Err(e) => {
            tracing::warn!(user_id, query, error = %e, "movie lookup failed");
            return Reply::Text(format::search_failed().to_string());
        }
    };
    let Some(picture_url) = movie.picture_url.clone() else {
        tracing::info!(user_id, movie = %movie.name, "movie has no usable picture");
        return Reply::Text(format::search_failed().to_string());
    };

    match services.links.find_watch_link(&movie.eng_name).await {
        Ok(link) => movie.google_link = link,
        Err(SearchError::NoLink) => tracing::debug!(title = %movie.eng_name, "no watch link"),
        Err(e) => tracing::warn!(title = %movie.eng_name, error = %e, "watch link search failed"),
    }

    if let Err(e) = services.log.add_request(user_id, &movie.name, date).await {
        tracing::error!(user_id, error = %e, "failed to log request");
    }
    tracing::info!(user_id, movie_id = movie.id, movie = %movie.name, "movie found");

    Reply::Card { caption: format::movie_card(&movie), picture_url }
}

pub async fn stats_text(services: &Services, user_id: u64) -> String {
    match services.log.stats(user_id).await {
        Ok(stats) => format::user_stats(&stats),
        Err(e) => {
            tracing::error!(user_id, error = %e, "failed to read stats");
            format::storage_unavailable().to_string()
        }
    }
}

pub async fn history_text(services: &Services, user_id: u64) -> String {
    match services.log.history(user_id).await {
        Ok(history) => format::user_history(&history),
        Err(e) => {
            tracing::error!(user_id, error = %e, "failed to read history");
            format::storage_unavailable().to_string()
        }
    }
}
