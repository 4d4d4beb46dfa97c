use crate::models::Movie;
use crate::picture::choose_picture;
use crate::text::{choose_description, normalize};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.kinopoisk.dev";
/// Подставляется, пока поиск не нашёл ссылку.
pub const NO_LINK_YET: &str = "Ссылка пока не найдена";

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("movie not found")]
    NotFound,
    #[error("metadata API quota exceeded")]
    QuotaExceeded,
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct KinopoiskClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl KinopoiskClient {
    pub fn new(api_key: String, base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { api_key, base_url, http }
    }

    /// Первый результат поиска по названию, с выбранной картинкой.
    /// Ссылку из поисковика сюда не кладём, её добавляет вызывающий код.
    pub async fn search_movie(&self, name: &str) -> Result<Movie, LookupError> {
        let query = normalize(name);
        if query.is_empty() {
            return Err(LookupError::NotFound);
        }
        let url = format!(
            "{}/v1.4/movie/search?query={}",
            self.base_url,
            urlencoding::encode(&query)
        );
        let resp = self.http.get(url).header("X-API-KEY", &self.api_key).send().await?;
        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            return Err(LookupError::QuotaExceeded);
        }
        if status != StatusCode::OK {
            tracing::warn!(%status, query = %query, "metadata search returned non-200");
            return Err(LookupError::NotFound);
        }

        let body = resp.text().await?;
        let data: SearchResp = serde_json::from_str(&body)?;
        if data.status_code == Some(403) {
            return Err(LookupError::QuotaExceeded);
        }
        let doc = data.docs.into_iter().next().ok_or(LookupError::NotFound)?;
        let name = match doc.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Err(LookupError::NotFound),
        };

        let picture_url = self.pick_picture(doc.poster.as_ref(), doc.backdrop.as_ref()).await;
        Ok(Movie {
            id: doc.id,
            eng_name: doc
                .alternative_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| name.clone()),
            name,
            genres: doc
                .genres
                .into_iter()
                .filter_map(|g| g.name)
                .filter(|n| !n.trim().is_empty())
                .collect(),
            rating: doc.rating.and_then(|r| r.kp).unwrap_or(0.0),
            description: choose_description(
                doc.short_description.as_deref(),
                doc.description.as_deref(),
            ),
            picture_url,
            crafted_link: format!("https://www.kinopoisk.ru/film/{}/", doc.id),
            google_link: NO_LINK_YET.to_string(),
        })
    }

    async fn pick_picture(&self, poster: Option<&Image>, backdrop: Option<&Image>) -> Option<String> {
        let poster = poster.and_then(|i| i.url.as_deref()).filter(|u| !u.is_empty());
        let backdrop = backdrop.and_then(|i| i.url.as_deref()).filter(|u| !u.is_empty());
        match (poster, backdrop) {
            (Some(p), Some(b)) => match choose_picture(&self.http, p, b).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(error = %e, "no picture selected");
                    None
                }
            },
            (Some(p), None) => Some(p.to_string()),
            (None, Some(b)) => Some(b.to_string()),
            (None, None) => None,
        }
    }
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug)]
struct SearchResp {
    #[serde(default)]
    docs: Vec<Doc>,
    #[serde(rename = "statusCode")]
    status_code: Option<u16>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Doc {
    id: u64,
    name: Option<String>,
    alternative_name: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    rating: Option<Rating>,
    short_description: Option<String>,
    description: Option<String>,
    poster: Option<Image>,
    backdrop: Option<Image>,
}

#[derive(Deserialize, Debug)]
struct Genre {
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Rating {
    kp: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct Image {
    url: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn inception_doc(server: &MockServer) -> serde_json::Value {
        json!({
            "id": 447301,
            "name": "Начало",
            "alternativeName": "Inception",
            "genres": [{"name": "фантастика"}, {"name": "боевик"}],
            "rating": {"kp": 8.665},
            "shortDescription": "Проникнуть в чужой сон.",
            "description": "Кобб, талантливый вор.",
            "poster": {"url": format!("{}/poster.jpg", server.uri())},
            "backdrop": {"url": format!("{}/backdrop.jpg", server.uri())}
        })
    }

    pub(crate) async fn mount_poster(server: &MockServer) {
        Mock::given(method("HEAD"))
            .and(path("/poster.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1024]))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> KinopoiskClient {
        KinopoiskClient::new("test-key".into(), server.uri(), Client::new())
    }

    #[tokio::test]
    async fn builds_movie_from_first_doc() {
        let server = MockServer::start().await;
        mount_poster(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.4/movie/search"))
            .and(query_param("query", "inception"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [inception_doc(&server), {"id": 1, "name": "Другой"}]
            })))
            .mount(&server)
            .await;

        let movie = client(&server).search_movie("  Inception!! ").await.unwrap();
        assert_eq!(movie.name, "Начало");
        assert_eq!(movie.eng_name, "Inception");
        assert_eq!(movie.genres, vec!["фантастика", "боевик"]);
        assert_eq!(movie.description, "Проникнуть в чужой сон.");
        assert_eq!(movie.picture_url, Some(format!("{}/poster.jpg", server.uri())));
        assert_eq!(movie.crafted_link, "https://www.kinopoisk.ru/film/447301/");
        assert_eq!(movie.google_link, NO_LINK_YET);
    }

    #[tokio::test]
    async fn empty_docs_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": []})))
            .mount(&server)
            .await;
        let err = client(&server).search_movie("nothing").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn empty_name_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": [{"id": 3, "name": ""}]})))
            .mount(&server)
            .await;
        let err = client(&server).search_movie("x").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn forbidden_is_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"statusCode": 403})))
            .mount(&server)
            .await;
        let err = client(&server).search_movie("matrix").await.unwrap_err();
        assert!(matches!(err, LookupError::QuotaExceeded));
    }

    #[tokio::test]
    async fn quota_reported_in_body_is_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statusCode": 403,
                "message": "Вы израсходовали ваш суточный лимит по количеству запросов"
            })))
            .mount(&server)
            .await;
        let err = client(&server).search_movie("matrix").await.unwrap_err();
        assert!(matches!(err, LookupError::QuotaExceeded));
    }

    #[tokio::test]
    async fn broken_genres_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [{
                    "id": 5,
                    "name": "Брат",
                    "genres": [{"name": null}, {}, {"name": " "}, {"name": "драма"}],
                    "poster": {"url": "https://img/p.jpg"}
                }]
            })))
            .mount(&server)
            .await;
        let movie = client(&server).search_movie("брат").await.unwrap();
        assert_eq!(movie.genres, vec!["драма"]);
    }

    #[tokio::test]
    async fn other_statuses_are_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let err = client(&server).search_movie("matrix").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let err = client(&server).search_movie("matrix").await.unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
    }

    #[tokio::test]
    async fn blank_query_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let err = client(&server).search_movie("?!").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn missing_optional_fields_have_fallbacks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [{"id": 9, "name": "Брат", "backdrop": {"url": "https://img/b.jpg"}}]
            })))
            .mount(&server)
            .await;
        let movie = client(&server).search_movie("брат").await.unwrap();
        assert_eq!(movie.eng_name, "Брат");
        assert_eq!(movie.rating, 0.0);
        assert!(movie.genres.is_empty());
        assert_eq!(movie.picture_url.as_deref(), Some("https://img/b.jpg"));
    }
}
