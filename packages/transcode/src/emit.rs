//! Indentation-aware text output.

/// Accumulates lines of generated code.
pub(crate) struct CodeWriter {
    out: String,
    depth: usize,
    unit: String,
}

impl CodeWriter {
    pub fn new(indent_width: usize) -> Self {
        Self {
            out: String::new(),
            depth: 0,
            unit: " ".repeat(indent_width),
        }
    }

    /// Write one line at the current depth. Empty lines carry no indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(&self.unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write a line and indent what follows.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent and write a closing line.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    /// Write a line one level out, staying at the current depth afterwards,
    /// as for `} else {`.
    pub fn branch(&mut self, text: impl AsRef<str>) {
        self.close(text);
        self.depth += 1;
    }

    /// Write a multi-line block, re-indenting each line to the current depth.
    pub fn block(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// A string literal in JavaScript syntax.
pub(crate) fn js_string(s: &str) -> String {
    // JSON string syntax is valid JavaScript.
    serde_json::Value::String(s.to_string()).to_string()
}

/// A number literal in JavaScript syntax.
pub(crate) fn js_number(n: f64) -> String {
    if n.is_finite() {
        let s = format!("{}", n);
        if s == "-0" {
            "0".to_string()
        } else {
            s
        }
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n > 0.0 {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting() {
        let mut w = CodeWriter::new(2);
        w.open("if (x) {");
        w.line("y();");
        w.blank();
        w.close("}");
        assert_eq!(w.finish(), "if (x) {\n  y();\n\n}\n");
    }

    #[test]
    fn block_reindents() {
        let mut w = CodeWriter::new(4);
        w.open("{");
        w.block("a;\nb;");
        w.close("}");
        assert_eq!(w.finish(), "{\n    a;\n    b;\n}\n");
    }

    #[test]
    fn literals() {
        assert_eq!(js_string("say \"hi\"\n"), r#""say \"hi\"\n""#);
        assert_eq!(js_number(10.0), "10");
        assert_eq!(js_number(-2.5), "-2.5");
        assert_eq!(js_number(-0.0), "0");
    }
}
