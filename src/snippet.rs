//! Source snippets under error messages, rendered with `annotate-snippets`.

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet, renderer::DecorStyle};

use crate::location::Location;

/// Lines of context shown above and below the error line.
const CONTEXT_LINES: usize = 2;

/// Render `msg` with a window of `text` around `location`.
///
/// Returns `None` when the location is unknown or outside the text. Lines
/// longer than `2 * crop_radius` characters are cropped around the error
/// column; `crop_radius == 0` keeps whole lines.
pub(crate) fn render_snippet(
    text: &str,
    path: &str,
    location: &Location,
    msg: &str,
    crop_radius: usize,
) -> Option<String> {
    if location == &Location::UNKNOWN {
        return None;
    }
    // Positions are computed after the BOM is dropped.
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let row = location.line as usize;
    let col = location.column as usize;

    let lines: Vec<&str> = text.lines().collect();
    if row == 0 || row > lines.len() {
        return None;
    }
    let first = row.saturating_sub(CONTEXT_LINES).max(1);
    let last = (row + CONTEXT_LINES).min(lines.len());

    let (left, right) = if crop_radius == 0 {
        (1, usize::MAX)
    } else {
        (col.saturating_sub(crop_radius).max(1), col.saturating_add(crop_radius))
    };

    let mut window = String::new();
    let mut span = 0..0;
    for (number, line) in (first..=last).zip(&lines[first - 1..last]) {
        let cropped = crop_columns(line, left, right);
        if number == row {
            let start = window.len() + byte_offset(&cropped, col + 1 - left.min(col));
            let end = cropped[start - window.len()..]
                .chars()
                .next()
                .map_or(start, |c| start + c.len_utf8());
            span = start..end;
        }
        window.push_str(&cropped);
        window.push('\n');
    }

    let report = &[Level::ERROR
        .primary_title(format!("line {row} column {col}: {}", first_line(msg)))
        .element(
            Snippet::source(&window)
                .line_start(first)
                .path(path)
                .fold(false)
                .annotation(AnnotationKind::Primary.span(span).label(first_line(msg))),
        )];

    let renderer = Renderer::plain().decor_style(DecorStyle::Ascii);
    let mut rendered = renderer.render(report).to_string();
    if msg.contains('\n') {
        rendered.push_str("\n\n");
        rendered.push_str(msg);
    }
    Some(rendered)
}

/// The first line of `msg` that says something, skipping headings like "An error occurred:".
fn first_line(msg: &str) -> &str {
    msg.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.ends_with(':'))
        .unwrap_or(msg)
}

/// Characters `left..=right` (1-based) of `line`.
fn crop_columns(line: &str, left: usize, right: usize) -> String {
    line.chars()
        .skip(left - 1)
        .take(right.saturating_sub(left).saturating_add(1))
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}

/// Byte offset of the 1-based character column `col`, clamped to the line end.
fn byte_offset(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col.saturating_sub(1))
        .map_or(line.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_at_the_error_column() {
        let text = "a: 1\nb: oops\nc: 3\n";
        let rendered =
            render_snippet(text, "<input>", &Location::new(2, 4), "bad value", 0).unwrap();
        assert!(rendered.contains("line 2 column 4: bad value"), "{rendered}");
        assert!(rendered.contains("b: oops"), "{rendered}");
        assert!(rendered.contains('^'), "{rendered}");
    }

    #[test]
    fn unknown_locations_render_nothing() {
        assert!(render_snippet("a: 1", "<input>", &Location::UNKNOWN, "x", 0).is_none());
        assert!(render_snippet("a: 1", "<input>", &Location::new(9, 1), "x", 0).is_none());
    }

    #[test]
    fn long_lines_are_cropped() {
        let line = format!("k: {}X{}", "a".repeat(200), "b".repeat(200));
        let rendered =
            render_snippet(&line, "<input>", &Location::new(1, 204), "here", 10).unwrap();
        assert!(!rendered.contains(&"a".repeat(50)), "{rendered}");
        assert!(rendered.contains('X'), "{rendered}");
    }
}
