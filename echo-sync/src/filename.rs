//! Derives local file names for delivered notes.

use crate::types::Note;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Extension given to every delivered note.
pub const NOTE_EXTENSION: &str = "md";

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, 'А'..='я') || c.is_whitespace()
}

/// Strips everything except ASCII letters and digits, basic Cyrillic
/// letters and whitespace. Line breaks and tabs become plain spaces and the
/// result is trimmed.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| is_kept(*c))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    kept.trim().to_string()
}

/// `YYYY-MM-DD title.md` for a note created at `created_at`.
pub fn file_name(title: &str, created_at: DateTime<Utc>) -> String {
    let date = created_at.format("%Y-%m-%d");
    let title = sanitize_title(title);
    if title.is_empty() {
        format!("{date}.{NOTE_EXTENSION}")
    } else {
        format!("{date} {title}.{NOTE_EXTENSION}")
    }
}

/// Path of a note's file relative to the vault root.
pub fn note_path(save_folder: &str, note: &Note) -> PathBuf {
    PathBuf::from(save_folder).join(file_name(&note.title, note.created_at))
}
