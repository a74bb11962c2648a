// Tue Jan 13 2026 - Alex

use colored::*;
use std::cmp::max;

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
    alignment: Vec<Alignment>,
    use_color: bool,
    border_style: BorderStyle,
    footer: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyle {
    None,
    Ascii,
    Unicode,
}

fn width_of(cell: &str) -> usize {
    cell.chars().count()
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
            column_widths: Vec::new(),
            alignment: Vec::new(),
            use_color: true,
            border_style: BorderStyle::Unicode,
            footer: None,
        }
    }

    pub fn with_headers(mut self, headers: &[&str]) -> Self {
        self.headers = headers.iter().map(|s| s.to_string()).collect();
        self.column_widths = self.headers.iter().map(|h| width_of(h)).collect();
        self.alignment = vec![Alignment::Left; self.headers.len()];
        self
    }

    fn widen(&mut self, row: &[String]) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.column_widths.len() {
                self.column_widths[i] = max(self.column_widths[i], width_of(cell));
            } else {
                self.column_widths.push(width_of(cell));
            }
        }
    }

    pub fn add_row<T: std::fmt::Display>(mut self, row: &[T]) -> Self {
        self.push_row(row);
        self
    }

    pub fn push_row<T: std::fmt::Display>(&mut self, row: &[T]) {
        let string_row: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        self.widen(&string_row);
        self.rows.push(string_row);
    }

    /// A totals line, set off from the body by a rule.
    pub fn with_footer<T: std::fmt::Display>(mut self, row: &[T]) -> Self {
        let string_row: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        self.widen(&string_row);
        self.footer = Some(string_row);
        self
    }

    pub fn with_alignment(mut self, column: usize, alignment: Alignment) -> Self {
        if column < self.alignment.len() {
            self.alignment[column] = alignment;
        }
        self
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn with_border_style(mut self, style: BorderStyle) -> Self {
        self.border_style = style;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn get_border_chars(&self) -> BorderChars {
        match self.border_style {
            BorderStyle::None => BorderChars::none(),
            BorderStyle::Ascii => BorderChars::ascii(),
            BorderStyle::Unicode => BorderChars::unicode(),
        }
    }

    fn align_cell(&self, content: &str, width: usize, alignment: Alignment) -> String {
        let pad = " ".repeat(width.saturating_sub(width_of(content)));
        match alignment {
            Alignment::Left => format!("{}{}", content, pad),
            Alignment::Right => format!("{}{}", pad, content),
        }
    }

    pub fn build(&self) -> String {
        if self.headers.is_empty() && self.rows.is_empty() {
            return String::new();
        }

        let mut output = Vec::new();
        let chars = self.get_border_chars();
        let widths = &self.column_widths;

        if chars.has_border() {
            output.push(self.build_horizontal_line(widths, &chars, LinePosition::Top));
        }

        if !self.headers.is_empty() {
            output.push(self.build_row(&self.headers, widths, &chars, true));
            if chars.has_border() {
                output.push(self.build_horizontal_line(widths, &chars, LinePosition::Middle));
            }
        }

        for row in &self.rows {
            output.push(self.build_row(row, widths, &chars, false));
        }

        if let Some(footer) = &self.footer {
            if chars.has_border() {
                output.push(self.build_horizontal_line(widths, &chars, LinePosition::Middle));
            }
            output.push(self.build_row(footer, widths, &chars, false));
        }

        if chars.has_border() {
            output.push(self.build_horizontal_line(widths, &chars, LinePosition::Bottom));
        }

        output.join("\n")
    }

    fn build_row(&self, cells: &[String], widths: &[usize], chars: &BorderChars, is_header: bool) -> String {
        let mut parts = Vec::new();

        if chars.has_border() {
            parts.push(chars.vertical.to_string());
        }

        for (i, cell) in cells.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or_else(|| width_of(cell));
            let alignment = self.alignment.get(i).copied().unwrap_or(Alignment::Left);
            let aligned = self.align_cell(cell, width, alignment);

            let formatted = if is_header && self.use_color {
                aligned.cyan().bold().to_string()
            } else {
                aligned
            };

            parts.push(format!(" {} ", formatted));

            if chars.has_border() {
                parts.push(chars.vertical.to_string());
            }
        }

        parts.join("").trim_end().to_string()
    }

    fn build_horizontal_line(&self, widths: &[usize], chars: &BorderChars, position: LinePosition) -> String {
        let (left, middle, right) = match position {
            LinePosition::Top => (chars.top_left, chars.top_middle, chars.top_right),
            LinePosition::Middle => (chars.middle_left, chars.middle_middle, chars.middle_right),
            LinePosition::Bottom => (chars.bottom_left, chars.bottom_middle, chars.bottom_right),
        };

        let mut parts = Vec::new();
        parts.push(left.to_string());

        for (i, &width) in widths.iter().enumerate() {
            parts.push(chars.horizontal.to_string().repeat(width + 2));
            if i + 1 < widths.len() {
                parts.push(middle.to_string());
            }
        }

        parts.push(right.to_string());
        parts.join("")
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum LinePosition {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy)]
struct BorderChars {
    horizontal: char,
    vertical: char,
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    top_middle: char,
    bottom_middle: char,
    middle_left: char,
    middle_right: char,
    middle_middle: char,
}

impl BorderChars {
    fn none() -> Self {
        Self {
            horizontal: ' ',
            vertical: ' ',
            top_left: ' ',
            top_right: ' ',
            bottom_left: ' ',
            bottom_right: ' ',
            top_middle: ' ',
            bottom_middle: ' ',
            middle_left: ' ',
            middle_right: ' ',
            middle_middle: ' ',
        }
    }

    fn ascii() -> Self {
        Self {
            horizontal: '-',
            vertical: '|',
            top_left: '+',
            top_right: '+',
            bottom_left: '+',
            bottom_right: '+',
            top_middle: '+',
            bottom_middle: '+',
            middle_left: '+',
            middle_right: '+',
            middle_middle: '+',
        }
    }

    fn unicode() -> Self {
        Self {
            horizontal: '─',
            vertical: '│',
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
            top_middle: '┬',
            bottom_middle: '┴',
            middle_left: '├',
            middle_right: '┤',
            middle_middle: '┼',
        }
    }

    fn has_border(&self) -> bool {
        self.vertical != ' '
    }
}
