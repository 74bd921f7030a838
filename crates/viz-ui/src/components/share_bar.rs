use crate::themes::Theme;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

/// Horizontal bar showing one category's share of the grand total.
pub struct ShareBar<'a> {
    /// Share in percent, clamped to `[0.0, 100.0]`.
    pub percentage: f64,
    /// Width of the bar portion in columns.
    pub width: u16,
    pub filled_char: char,
    pub empty_char: char,
    pub fill: Style,
    pub theme: &'a Theme,
}

impl<'a> ShareBar<'a> {
    pub fn new(percentage: f64, fill: Style, theme: &'a Theme) -> Self {
        Self {
            percentage: percentage.clamp(0.0, 100.0),
            width: 20,
            filled_char: '\u{2588}', // █
            empty_char: '\u{2591}',  // ░
            fill,
            theme,
        }
    }

    pub fn width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    /// Render as a filled span, an empty span and a `" 41.6%"` label.
    pub fn to_line(&self) -> Line<'a> {
        let filled = ((self.percentage / 100.0) * self.width as f64).round() as u16;
        let filled = filled.min(self.width);
        let empty = self.width - filled;

        let filled_str: String =
            std::iter::repeat_n(self.filled_char, filled as usize).collect();
        let empty_str: String = std::iter::repeat_n(self.empty_char, empty as usize).collect();

        Line::from(vec![
            Span::styled(filled_str, self.fill),
            Span::styled(empty_str, self.theme.bar_empty),
            Span::styled(
                format!(" {}", viz_core::formatting::format_percent(self.percentage)),
                self.theme.label,
            ),
        ])
    }
}
