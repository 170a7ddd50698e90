use std::fmt::Write as _;

/// Column every `=` separator aligns to, measured from the line start.
pub const FIELD_WIDTH: usize = 30;

/// Indent margin for one nesting level.
pub const INDENT: &str = "    ";

/// Builder for a single `ADD <TYPE>` stanza with aligned key/value fields.
///
/// Fields render as `    KEY<pad> = VALUE` with the key padded so the `=`
/// lands at column [`FIELD_WIDTH`]. Longer keys push the separator right
/// rather than truncating.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    block_type: String,
    indent_levels: usize,
    lines: Vec<String>,
}

impl BlockBuilder {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            indent_levels: 0,
            lines: Vec::new(),
        }
    }

    /// Indent the whole block by `levels` margins (nested sub-blocks).
    pub fn indented(mut self, levels: usize) -> Self {
        self.indent_levels = levels;
        self
    }

    /// Append a field line. Call order is emission order.
    pub fn field(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.push_field(key.as_ref(), value.as_ref());
        self
    }

    /// Append a field only when a value is present.
    pub fn field_opt(self, key: impl AsRef<str>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    fn push_field(&mut self, key: &str, value: &str) {
        // Key padded so the `=` lands at column FIELD_WIDTH.
        let pad = FIELD_WIDTH
            .saturating_sub(INDENT.len() + 1)
            .max(key.len());
        self.lines.push(format!("{INDENT}{key:<pad$} = {value}"));
    }

    /// Render the stanza, without a trailing newline.
    pub fn render(&self) -> String {
        let margin = INDENT.repeat(self.indent_levels);
        let mut out = String::new();
        let _ = write!(out, "{margin}ADD {}", self.block_type);
        for line in &self.lines {
            let _ = write!(out, "\n{margin}{line}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_align_to_column_thirty() {
        let block = BlockBuilder::new("RULE")
            .field("RULESETNAME", "RABOC010-PBKOC01R")
            .render();
        let field_line = block.lines().nth(1).unwrap();
        assert_eq!(field_line, "    RULESETNAME               = RABOC010-PBKOC01R");
        assert_eq!(field_line.find('=').unwrap(), FIELD_WIDTH);
    }

    #[test]
    fn long_keys_push_separator_right() {
        let block = BlockBuilder::new("RULECOMPONENT")
            .field("USEPREVIOUSPAGEVALUEEXTENDED", "N")
            .render();
        assert!(block.contains("USEPREVIOUSPAGEVALUEEXTENDED = N"));
    }

    #[test]
    fn indented_blocks_carry_the_margin_on_every_line() {
        let block = BlockBuilder::new("RULECOMPONENT")
            .field("VARIABLE", "&RPT_COMPANY")
            .indented(1)
            .render();
        for line in block.lines() {
            assert!(line.starts_with(INDENT), "unindented line: {line}");
        }
        assert!(block.starts_with("    ADD RULECOMPONENT"));
    }

    #[test]
    fn optional_fields_are_skipped_when_absent() {
        let block = BlockBuilder::new("DESTINATION")
            .field("NAME", "x")
            .field_opt("TITLE", None)
            .render();
        assert!(!block.contains("TITLE"));
    }
}
