use ropey::Rope;

pub trait RopeExt {
    /// Get the content of the line at the given row index, without the
    /// trailing `\n` / `\r\n`.
    ///
    /// Returns an empty string if the row is out of bounds.
    fn line_str(&self, row: usize) -> String;

    /// Return the number of lines in the rope.
    ///
    /// A trailing `\n` does not start a new line.
    fn lines_len(&self) -> usize;

    /// Char length of the line at `row`, without the line terminator.
    fn line_len(&self, row: usize) -> usize;
}

impl RopeExt for Rope {
    fn line_str(&self, row: usize) -> String {
        if row >= self.lines_len() {
            return String::new();
        }
        let line = self.line(row);
        let mut text = line.to_string();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        text
    }

    fn lines_len(&self) -> usize {
        let len = self.len_lines();
        // Ropey counts the empty line after a trailing `\n`.
        if len > 1 && self.char(self.len_chars() - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    fn line_len(&self, row: usize) -> usize {
        if row >= self.lines_len() {
            return 0;
        }
        let line = self.line(row);
        let mut len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
        }
        if len > 0 && line.char(len - 1) == '\r' {
            len -= 1;
        }
        len
    }
}
