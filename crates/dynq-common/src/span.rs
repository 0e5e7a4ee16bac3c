use serde::Serialize;

/// Character-offset span into source text. Start is inclusive, end is exclusive.
///
/// Positions in dynq are zero-based character (not byte) offsets into the
/// expression string, which is what callers use for caret diagnostics and
/// what ariadne expects by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from character offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// A zero-length span at `pos`.
    pub fn at(pos: u32) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_span() {
        assert_eq!(Span::at(3), Span::new(3, 3));
    }
}
