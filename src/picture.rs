use reqwest::{header::CONTENT_LENGTH, Client};
use thiserror::Error;

/// Постер тяжелее этого в Telegram не отправляем, берём задник.
pub const MAX_POSTER_BYTES: u64 = 7_345_728;

#[derive(Error, Debug)]
pub enum PictureError {
    #[error("no Content-Length for {0}")]
    UnknownSize(String),
    #[error("size check failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Решение по размеру постера (если его удалось узнать).
pub fn pick_picture(
    poster_len: Option<u64>,
    poster_url: &str,
    backdrop_url: &str,
) -> Result<String, PictureError> {
    match poster_len {
        Some(len) if len <= MAX_POSTER_BYTES => Ok(poster_url.to_string()),
        Some(_) => Ok(backdrop_url.to_string()),
        None => Err(PictureError::UnknownSize(poster_url.to_string())),
    }
}

/// HEAD-запрос к постеру без скачивания тела, затем `pick_picture`.
pub async fn choose_picture(
    http: &Client,
    poster_url: &str,
    backdrop_url: &str,
) -> Result<String, PictureError> {
    let resp = http.head(poster_url).send().await?;
    let len = resp
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    pick_picture(len, poster_url, backdrop_url)
}
