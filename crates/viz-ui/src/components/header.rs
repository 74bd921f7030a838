use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Decoration placed either side of the application title.
pub const ORNAMENT: &str = "◆ ◇ ◆";

/// Report header rendering three lines:
///
/// 1. Application title with ornaments.
/// 2. A separator as wide as `width`.
/// 3. Summary in `[ total | records | categories ]` format.
pub struct Header<'a> {
    pub title: &'a str,
    /// Preformatted grand total, e.g. `"77.00元"`.
    pub total: String,
    pub records: String,
    pub categories: String,
    pub width: u16,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(title: &'a str, total: String, theme: &'a Theme) -> Self {
        Self {
            title,
            total,
            records: String::new(),
            categories: String::new(),
            width: 60,
            theme,
        }
    }

    pub fn counts(mut self, records: String, categories: String) -> Self {
        self.records = records;
        self.categories = categories;
        self
    }

    pub fn width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut info = vec![
            Span::styled("[ ", self.theme.label),
            Span::styled(self.total.clone(), self.theme.value),
        ];
        for part in [&self.records, &self.categories] {
            if !part.is_empty() {
                info.push(Span::styled(" | ", self.theme.label));
                info.push(Span::styled(part.clone(), self.theme.value));
            }
        }
        info.push(Span::styled(" ]", self.theme.label));

        vec![
            Line::from(vec![
                Span::styled(ORNAMENT, self.theme.separator),
                Span::styled(format!(" {} ", self.title), self.theme.header),
                Span::styled(ORNAMENT, self.theme.separator),
            ]),
            Line::from(Span::styled(
                "=".repeat(self.width as usize),
                self.theme.separator,
            )),
            Line::from(info),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_header_lines() {
        let theme = Theme::dark();
        let lines = Header::new("LEDGER VIZ", "77.00元".to_string(), &theme)
            .counts("2 笔".to_string(), "2 类".to_string())
            .to_lines();

        assert_eq!(lines.len(), 3);
        assert!(text(&lines[0]).contains("LEDGER VIZ"));
        assert_eq!(text(&lines[1]).chars().count(), 60);
        assert_eq!(text(&lines[2]), "[ 77.00元 | 2 笔 | 2 类 ]");
    }

    #[test]
    fn test_header_without_counts() {
        let theme = Theme::light();
        let lines = Header::new("LEDGER VIZ", "0.00".to_string(), &theme)
            .width(10)
            .to_lines();
        assert_eq!(text(&lines[1]), "==========");
        assert_eq!(text(&lines[2]), "[ 0.00 ]");
    }
}
