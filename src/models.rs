/// Карточка фильма, собирается заново на каждый запрос.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub name: String,
    /// Альтернативное (обычно английское) название, по нему ищем ссылку.
    pub eng_name: String,
    pub genres: Vec<String>,
    pub rating: f64,
    pub description: String,
    pub picture_url: Option<String>,
    pub crafted_link: String,
    pub google_link: String,
}

/// Запросы пользователя в порядке хранения: (unix-время, название).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserHistory {
    pub requests: Vec<(i64, String)>,
    pub num_requests: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStats {
    pub num_requests: u64,
    /// название -> число запросов, в порядке первого появления
    pub requested_movies: Vec<(String, u64)>,
    pub favourite_movie: String,
}

impl UserStats {
    /// Собирает статистику из пар (название, количество) в порядке первого появления.
    /// При равенстве любимым остаётся тот, что встретился раньше.
    pub fn from_counts(requested_movies: Vec<(String, u64)>) -> Self {
        let num_requests = requested_movies.iter().map(|(_, n)| n).sum();
        let mut favourite_movie = String::new();
        let mut best = 0;
        for (movie, n) in &requested_movies {
            if *n > best {
                best = *n;
                favourite_movie = movie.clone();
            }
        }
        Self { num_requests, requested_movies, favourite_movie }
    }
}
