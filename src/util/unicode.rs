use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to at most `max_cells` terminal cells, ending in `…` when cut.
/// Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut out = String::new();
    for grapheme in s.graphemes(true) {
        let gw = UnicodeWidthStr::width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        out.push_str(grapheme);
    }
    out.push('\u{2026}');
    out
}

/// Truncate or right-pad with spaces to exactly `cells` wide, for table
/// columns. Wide characters that would overshoot are dropped.
pub fn fit_to_width(s: &str, cells: usize) -> String {
    let mut out = truncate_to_width(s, cells);
    let w = display_width(&out);
    out.extend(std::iter::repeat_n(' ', cells.saturating_sub(w)));
    out
}

/// Collapse a multi-line text to its first line, for one-line listings
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_wide_chars() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate_to_width("walk", 10), "walk");
        assert_eq!(truncate_to_width("walk", 4), "walk");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("meditation", 5), "medi\u{2026}");
        assert_eq!(truncate_to_width("meditation", 1), "\u{2026}");
        assert_eq!(truncate_to_width("meditation", 0), "");
    }

    #[test]
    fn truncate_keeps_graphemes_whole() {
        // e + combining acute is one grapheme, one cell
        let s = "cafe\u{301} au lait";
        let t = truncate_to_width(s, 5);
        assert_eq!(t, "cafe\u{301}\u{2026}");
    }

    #[test]
    fn fit_pads_and_cuts() {
        assert_eq!(fit_to_width("ab", 4), "ab  ");
        assert_eq!(fit_to_width("abcdef", 4), "abc\u{2026}");
        assert_eq!(display_width(&fit_to_width("日本語", 4)), 4);
    }

    #[test]
    fn first_line_of_text() {
        assert_eq!(first_line("one\ntwo"), "one");
        assert_eq!(first_line(""), "");
    }
}
