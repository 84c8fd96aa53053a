//! Разбиение текста сегмента на фрагменты ограниченной длины
//!
//! Движки синтеза плохо переносят длинные входы, поэтому текст режется
//! по предложениям, длинные предложения - по словам, а слишком длинные
//! слова - на куски фиксированной длины. Длина считается в символах,
//! а не в байтах.

use once_cell::sync::Lazy;
use regex::Regex;

/// Длина фрагмента по умолчанию
pub const DEFAULT_MAX_CHARS: usize = 180;

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary regex is valid"));

/// Разбить текст на непустые фрагменты длиной не более `max_chars` символов.
///
/// Склейка фрагментов через пробел воспроизводит слова исходного текста
/// в исходном порядке (с нормализованными пробелами). Для непустого входа
/// всегда возвращается хотя бы один фрагмент.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() {
        return hard_slice(text, max_chars);
    }

    if char_len(&normalized) <= max_chars {
        return vec![normalized];
    }

    let mut packer = Packer::new(max_chars);
    for sentence in split_sentences(&normalized) {
        if char_len(sentence) <= max_chars {
            packer.push(sentence);
            continue;
        }

        for word in sentence.split(' ').filter(|w| !w.is_empty()) {
            if char_len(word) <= max_chars {
                packer.push(word);
            } else {
                for piece in hard_slice(word, max_chars) {
                    packer.push(&piece);
                }
            }
        }
    }

    let chunks: Vec<String> = packer
        .finish()
        .into_iter()
        .flat_map(|chunk| {
            if char_len(&chunk) > max_chars {
                hard_slice(&chunk, max_chars)
            } else {
                vec![chunk]
            }
        })
        .filter(|chunk| !chunk.trim().is_empty())
        .collect();

    if chunks.is_empty() {
        log::warn!("Chunking produced nothing for {} chars, slicing raw text", char_len(text));
        return hard_slice(text, max_chars);
    }

    chunks
}

/// Жадная упаковка кусков текста во фрагменты
struct Packer {
    max_chars: usize,
    current: String,
    current_len: usize,
    chunks: Vec<String>,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            current: String::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str) {
        let piece_len = char_len(piece);
        if self.current.is_empty() {
            self.current.push_str(piece);
            self.current_len = piece_len;
        } else if self.current_len + piece_len + 1 <= self.max_chars {
            self.current.push(' ');
            self.current.push_str(piece);
            self.current_len += piece_len + 1;
        } else {
            self.flush();
            self.current.push_str(piece);
            self.current_len = piece_len;
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// Разбить текст на предложения по `.`, `!` или `?`, за которыми идет пробел
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for m in SENTENCE_END.find_iter(text) {
        // Знак препинания - один ASCII-байт
        let sentence = text[last..m.start() + 1].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        last = m.end();
    }

    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Нарезать строку на куски по `size` символов
fn hard_slice(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect::<String>())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
