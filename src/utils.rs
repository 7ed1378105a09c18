//! Utility functions for filename normalization, text splitting, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Filename normalization for video and playlist titles
//! - Deterministic output names for archive articles
//! - Description splitting and publication date formatting
//! - String truncation for logging
//! - File system validation for output directories

use chrono::DateTime;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::fetch::BoxError;

/// Normalize a title into a filesystem-friendly name.
///
/// The mapping is applied in this order:
///
/// 1. Transliterate to ASCII (see [`transliterate`]); unmapped non-ASCII
///    characters are dropped
/// 2. Trim leading and trailing spaces
/// 3. Remove `, . " ' -`, the path-hostile `/ \ : * ? < > |` and control characters
/// 4. Replace every space with `_` (runs are kept, not collapsed)
/// 5. Lowercase
///
/// An input that normalizes to nothing becomes `"untitled"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_for_filename("Mañanera del 5 de mayo"), "mananera_del_5_de_mayo");
/// assert_eq!(normalize_for_filename("¿Qué es la 4T?"), "que_es_la_4t");
/// ```
pub fn normalize_for_filename(text: &str) -> String {
    let ascii = transliterate(text);
    let normalized: String = ascii
        .trim_matches(' ')
        .chars()
        .filter(|c| !is_stripped(*c))
        .map(|c| if c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .collect();

    if normalized.is_empty() {
        "untitled".to_string()
    } else {
        normalized
    }
}

fn is_stripped(c: char) -> bool {
    matches!(
        c,
        ',' | '.' | '"' | '\'' | '-' | '/' | '\\' | ':' | '*' | '?' | '<' | '>' | '|'
    ) || c.is_ascii_control()
}

/// Transliterate text to ASCII with an explicit character table.
///
/// Covers Latin-1 Supplement and Latin Extended-A letters, typographic
/// punctuation and non-breaking spaces. Anything else outside ASCII is dropped.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else if let Some(mapped) = ascii_for(c) {
            out.push_str(mapped);
        }
    }
    out
}

fn ascii_for(c: char) -> Option<&'static str> {
    let mapped = match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'ª' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => "C",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ð' | 'Ď' | 'Đ' => "D",
        'ð' | 'ď' | 'đ' => "d",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĥ' | 'Ħ' => "H",
        'ĥ' | 'ħ' => "h",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Ĳ' => "IJ",
        'ĳ' => "ij",
        'Ĵ' => "J",
        'ĵ' => "j",
        'Ķ' => "K",
        'ķ' | 'ĸ' => "k",
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' => "L",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' | 'Ŋ' => "N",
        'ñ' | 'ń' | 'ņ' | 'ň' | 'ŉ' | 'ŋ' => "n",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' | 'º' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => "S",
        'ś' | 'ŝ' | 'ş' | 'š' | 'ſ' => "s",
        'ß' => "ss",
        'Ţ' | 'Ť' | 'Ŧ' => "T",
        'ţ' | 'ť' | 'ŧ' => "t",
        'Þ' => "TH",
        'þ' => "th",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'Ŵ' => "W",
        'ŵ' => "w",
        'Ý' | 'Ŷ' | 'Ÿ' => "Y",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        '‘' | '’' | '‚' | '′' => "'",
        '“' | '”' | '„' | '″' | '«' | '»' => "\"",
        '‐' | '‑' | '‒' | '–' | '—' | '―' | '−' => "-",
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => " ",
        '…' => "...",
        _ => return None,
    };
    Some(mapped)
}

/// Derive the output filename of an archive article from its URL.
///
/// Keeps the last path segment, cuts it at `?idiom`, replaces `-` with `_`
/// and appends `.txt`.
///
/// ```ignore
/// assert_eq!(
///     archive_filename("https://www.gob.mx/presidencia/articulos/version-estenografica-1?idiom=es"),
///     "version_estenografica_1.txt"
/// );
/// ```
pub fn archive_filename(url: &str) -> String {
    let last = url.rsplit('/').next().unwrap_or(url);
    let stem = last.split("?idiom").next().unwrap_or(last);
    format!("{}.txt", stem.replace('-', "_"))
}

/// Format an RFC 3339 timestamp as `YYYY_MM_DD`.
///
/// Falls back to the text before `T` when the timestamp does not parse.
pub fn publication_date(published_at: &str) -> String {
    match DateTime::parse_from_rfc3339(published_at) {
        Ok(ts) => ts.format("%Y_%m_%d").to_string(),
        Err(_) => published_at
            .split('T')
            .next()
            .unwrap_or(published_at)
            .replace('-', "_"),
    }
}

/// Split a video description into paragraphs, dropping those containing links.
pub fn description_paragraphs(description: &str) -> Vec<&str> {
    description
        .split("\n\n")
        .filter(|p| !p.contains("http"))
        .collect()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a character boundary at or below `max` bytes with
/// an ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), BoxError> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
