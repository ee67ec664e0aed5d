//! Summary note - the HTML body written back to Zotero.

/// A summary ready to be stored as a child note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryNote {
    /// Note body in Zotero's note HTML
    pub html: String,
    /// Tags applied on creation
    pub tags: Vec<String>,
}

impl SummaryNote {
    /// Wrap model output in the note template and mark it with `summary_tag`.
    pub fn new(summary: &str, summary_tag: &str) -> Self {
        Self {
            html: render_html(summary),
            tags: vec![summary_tag.to_string()],
        }
    }
}

/// One `<p>` per non-blank line, inside Zotero's schema-versioned wrapper.
pub fn render_html(summary: &str) -> String {
    let paragraphs: String = summary
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect();
    format!("<div data-schema-version=\"9\">{}</div>", paragraphs)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_summary() {
        let note = SummaryNote::new("X is discussed.", "AI-Summary");
        assert_eq!(
            note.html,
            "<div data-schema-version=\"9\"><p>X is discussed.</p></div>"
        );
        assert_eq!(note.tags, vec!["AI-Summary"]);
    }

    #[test]
    fn lines_become_paragraphs_and_markup_is_escaped() {
        let html = render_html("## Findings\n\nA < B & C\n   \nDone");
        assert_eq!(
            html,
            "<div data-schema-version=\"9\"><p>## Findings</p><p>A &lt; B &amp; C</p><p>Done</p></div>"
        );
    }
}
