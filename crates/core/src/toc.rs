//! Heuristic extraction of chapter titles from a generated table of
//! contents. The input is free-form model output, so the parser tolerates
//! missing numbering, stray prose and blank lines without failing.

/// Books are capped at eight chapters regardless of how long the generated
/// table of contents turns out to be.
pub const MAX_CHAPTERS: usize = 8;

/// Collects the titles of numbered lines, in order of appearance.
///
/// A line counts as a chapter entry when any of its first three characters
/// is a digit. The leading numbering (digits, dots, dashes, spaces) is
/// stripped; a line consisting of nothing but numbering characters is kept
/// whole rather than dropped.
pub fn extract_chapter_titles(toc_text: &str) -> Vec<String> {
    let mut titles = Vec::new();

    for line in toc_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.chars().take(3).any(|c| c.is_ascii_digit()) {
            continue;
        }

        let title = match line.char_indices().find(|(_, c)| !is_numbering_char(*c)) {
            Some((index, _)) => line[index..].trim(),
            None => line,
        };
        if title.is_empty() {
            continue;
        }

        titles.push(title.to_string());
        if titles.len() == MAX_CHAPTERS {
            break;
        }
    }

    titles
}

fn is_numbering_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '-' | ' ')
}
