#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
/// Represents a span of text in the source code.
pub struct Span {
    /// The start index of the span.
    pub start: u32,
    /// The end index of the span.
    pub end: u32,
}

impl Span {
    /// Creates a span covering `start..end`.
    pub fn new(start: usize, end: usize) -> Span {
        Span {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Returns the text of the span.
    pub fn text(self, source: &str) -> &str {
        &source[self.start as usize..self.end as usize]
    }

    pub fn len(self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Returns the 1-based line and column of the start of the span.
    pub fn line_column(self, source: &str) -> (usize, usize) {
        let start = (self.start as usize).min(source.len());
        let before = &source[..start];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(idx) => before[idx + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{start}..{end}", start = self.start, end = self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_returns_correct_substring() {
        let source = "hello world";
        let span = Span { start: 0, end: 5 };
        assert_eq!(span.text(source), "hello");

        let span = Span { start: 6, end: 11 };
        assert_eq!(span.text(source), "world");
    }

    #[test]
    fn line_column_counts_from_one() {
        let source = "fn main\n  x = 1;";
        assert_eq!(Span { start: 0, end: 2 }.line_column(source), (1, 1));
        assert_eq!(Span { start: 10, end: 11 }.line_column(source), (2, 3));
    }
}
