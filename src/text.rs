use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").expect("static regex"));

/// Описания короче этого (в символах) отдаём как есть.
pub const DESCRIPTION_LIMIT: usize = 800;
/// Границу предложения ищем не раньше этого символа.
const BOUNDARY_FROM: usize = 500;

/// Приводит запрос к виду, который понимает поиск: нижний регистр,
/// без пунктуации, одиночные пробелы.
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");
    SEPARATORS.replace_all(&cleaned, " ").trim().to_string()
}

/// Короткое описание, если оно непустое, иначе полное.
/// Длинный текст режем по первому ". " в окне [500, 800) символов,
/// а если его там нет, то ровно по 800-му символу.
pub fn choose_description(short: Option<&str>, full: Option<&str>) -> String {
    let text = match short {
        Some(s) if !s.is_empty() => s,
        _ => full.unwrap_or_default(),
    };
    if text.chars().count() < DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let cut = sentence_boundary(text).unwrap_or_else(|| byte_offset(text, DESCRIPTION_LIMIT));
    format!("{}...", &text[..cut])
}

fn sentence_boundary(text: &str) -> Option<usize> {
    let from = byte_offset(text, BOUNDARY_FROM);
    let to = byte_offset(text, DESCRIPTION_LIMIT);
    text[from..to].find(". ").map(|i| from + i)
}

// байтовый индекс `chars`-го символа (или конец строки)
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(text.len())
}
