/// Text shaping for the terminal: `**bold**` spans and word wrapping.
///
/// Widths are counted in chars; the essay text is plain prose with no
/// double-width glyphs.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span { text: text.into(), bold: false }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Span { text: text.into(), bold: true }
    }

    pub fn width(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `**bold**` markers into spans. An unmatched `**` is kept literally.
pub fn parse_bold(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else { break };
        if open > 0 {
            spans.push(Span::plain(&rest[..open]));
        }
        if close > 0 {
            spans.push(Span::bold(&after[..close]));
        }
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        spans.push(Span::plain(rest));
    }
    spans
}

/// Word-wrap rich text to `width` columns. Words longer than a line are
/// hard-split.
///
/// A word runs until the next whitespace in the source, even across a
/// bold boundary, so `**term**:` stays one word.
pub fn wrap_rich(text: &str, width: usize) -> Vec<Vec<Span>> {
    let width = width.max(1);
    let mut lines: Vec<Vec<Span>> = Vec::new();
    let mut line: Vec<Span> = Vec::new();
    let mut used = 0;

    for word in words(text) {
        let len = word.len();
        if used > 0 && used + 1 + len <= width {
            let bold = line.last().map_or(false, |s| s.bold) && word[0].1;
            push_text(&mut line, " ", bold);
            push_chars(&mut line, &word);
            used += 1 + len;
            continue;
        }
        if used > 0 {
            lines.push(std::mem::take(&mut line));
            used = 0;
        }
        // Word alone may be wider than the line.
        let mut rest = word.as_slice();
        while rest.len() > width {
            let (head, tail) = rest.split_at(width);
            push_chars(&mut line, head);
            lines.push(std::mem::take(&mut line));
            rest = tail;
        }
        push_chars(&mut line, rest);
        used = rest.len();
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Whitespace-separated words as `(char, bold)` runs.
fn words(text: &str) -> Vec<Vec<(char, bool)>> {
    let mut out: Vec<Vec<(char, bool)>> = Vec::new();
    let mut gap = true;
    for span in parse_bold(text) {
        for c in span.text.chars() {
            if c.is_whitespace() {
                gap = true;
                continue;
            }
            match out.last_mut() {
                Some(word) if !gap => word.push((c, span.bold)),
                _ => out.push(vec![(c, span.bold)]),
            }
            gap = false;
        }
    }
    out
}

fn push_chars(line: &mut Vec<Span>, chars: &[(char, bool)]) {
    for &(c, bold) in chars {
        let mut buf = [0u8; 4];
        push_text(line, c.encode_utf8(&mut buf), bold);
    }
}

/// Plain word wrap.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    wrap_rich(text, width)
        .into_iter()
        .map(|spans| spans.into_iter().map(|s| s.text).collect())
        .collect()
}

/// Cut `text` to `width` columns, ending in `…` when shortened.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn push_text(line: &mut Vec<Span>, text: &str, bold: bool) {
    match line.last_mut() {
        Some(last) if last.bold == bold => last.text.push_str(text),
        _ => line.push(Span { text: text.to_string(), bold }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bold_markers_become_spans() {
        assert_eq!(
            parse_bold("costs **rise** sharply"),
            vec![Span::plain("costs "), Span::bold("rise"), Span::plain(" sharply")]
        );
        assert_eq!(parse_bold("a ** b"), vec![Span::plain("a ** b")]);
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn long_words_are_split() {
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn bold_survives_wrapping() {
        let lines = wrap_rich("see **very important** text", 9);
        assert_eq!(lines[0], vec![Span::plain("see "), Span::bold("very")]);
        assert_eq!(lines[1], vec![Span::bold("important")]);
        assert_eq!(lines[2], vec![Span::plain("text")]);
    }

    #[test]
    fn punctuation_after_bold_stays_attached() {
        assert_eq!(
            wrap("needs **most of what a client needs**: more", 80),
            vec!["needs most of what a client needs: more"]
        );
        let lines = wrap_rich("the **queue**.", 40);
        assert_eq!(lines[0], vec![Span::plain("the "), Span::bold("queue"), Span::plain(".")]);
    }

    #[test]
    fn words_glued_across_bold_wrap_together() {
        assert_eq!(wrap("a **bold**, b", 6), vec!["a", "bold,", "b"]);
        assert_eq!(wrap("**out-file** the", 20), vec!["out-file the"]);
    }

    #[test]
    fn truncate_adds_an_ellipsis() {
        assert_eq!(truncate("Regulatory", 20), "Regulatory");
        assert_eq!(truncate("Regulatory", 6), "Regul…");
    }
}
