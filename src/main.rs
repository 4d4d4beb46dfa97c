mod config;
mod format;
mod kinopoisk;
mod lookup;
mod models;
mod picture;
mod search;
mod storage;
mod text;
mod tg;

use dotenvy::dotenv;
use search::{CachedLinkFinder, GoogleSearch, LinkFinder, NoLinkFinder};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::Config::from_env()?;

    // один HTTP-клиент на все внешние сервисы
    let http = reqwest::Client::builder()
        .user_agent(concat!("kinobot/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let kinopoisk = kinopoisk::KinopoiskClient::new(cfg.kp_api_token.clone(), cfg.kp_api_url.clone(), http.clone());

    let links: Arc<dyn LinkFinder> = if cfg.web_search_enabled {
        let google: Arc<dyn LinkFinder> = Arc::new(GoogleSearch::new(
            http.clone(),
            cfg.search_url.clone(),
            cfg.search_lang.clone(),
            cfg.search_sleep,
            cfg.search_timeout,
        ));
        if cfg.search_cache_ttl.is_zero() {
            google
        } else {
            Arc::new(CachedLinkFinder::new(google, cfg.search_cache_ttl))
        }
    } else {
        tracing::info!("web search disabled");
        Arc::new(NoLinkFinder)
    };

    let log = storage::SqliteUsageLog::open(&cfg.db_path)?;
    tracing::info!(path = %cfg.db_path, "usage log ready");

    let services = lookup::Services { kinopoisk, links, log: Arc::new(log) };
    let bot = Bot::new(cfg.bot_token.clone());
    tg::run(bot, services, http).await;
    Ok(())
}
