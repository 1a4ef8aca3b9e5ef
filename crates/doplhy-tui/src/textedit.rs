//! Cursor-aware editing buffers for the key form, question box and knowledge panel.
//!
//! Cursors are character indices, never byte offsets, so multi-byte input is safe.

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line input. Newlines in pasted text become spaces.
#[derive(Debug, Default, Clone)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let c = if c == '\n' || c == '\r' { ' ' } else { c };
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Slice that fits in `width` columns with the cursor kept visible, plus the cursor column.
    pub fn visible(&self, width: usize) -> (String, usize) {
        let scroll_offset = if width == 0 {
            0
        } else if self.cursor >= width {
            self.cursor - width + 1
        } else {
            0
        };

        let visible_text: String = self
            .value
            .chars()
            .skip(scroll_offset)
            .take(width)
            .collect();

        (visible_text, self.cursor - scroll_offset)
    }
}

/// Multi-line buffer with hard wrapping for display.
#[derive(Debug, Default, Clone)]
pub struct TextArea {
    text: String,
    cursor: usize,
}

impl TextArea {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), cursor: 0 }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let c = if c == '\r' { '\n' } else { c };
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        let normalized = s.replace("\r\n", "\n");
        for c in normalized.chars() {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    /// Logical (line, column) of the cursor.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.text.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn line_lengths(&self) -> Vec<usize> {
        self.text.split('\n').map(|l| l.chars().count()).collect()
    }

    fn move_to(&mut self, line: usize, col: usize) {
        let lengths = self.line_lengths();
        let line = line.min(lengths.len() - 1);
        let before: usize = lengths[..line].iter().map(|len| len + 1).sum();
        self.cursor = before + col.min(lengths[line]);
    }

    pub fn up(&mut self) {
        let (line, col) = self.cursor_line_col();
        if line > 0 {
            self.move_to(line - 1, col);
        }
    }

    pub fn down(&mut self) {
        let (line, col) = self.cursor_line_col();
        self.move_to(line + 1, col);
    }

    pub fn home(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.move_to(line, 0);
    }

    pub fn end(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.move_to(line, usize::MAX);
    }

    /// Display rows, each logical line cut into chunks of `width` characters.
    pub fn wrapped_lines(&self, width: usize) -> Vec<String> {
        self.text.split('\n').flat_map(|line| wrap_chars(line, width)).collect()
    }

    /// (row, column) of the cursor within [`TextArea::wrapped_lines`].
    ///
    /// A cursor just past a line that fills its last row exactly stays on that
    /// row at column `width`.
    pub fn cursor_visual(&self, width: usize) -> (usize, usize) {
        let width = width.max(1);
        let (line, col) = self.cursor_line_col();
        let lengths = self.line_lengths();
        let rows_before: usize = lengths[..line]
            .iter()
            .map(|&len| if len == 0 { 1 } else { len.div_ceil(width) })
            .sum();
        if col > 0 && col == lengths[line] && col % width == 0 {
            return (rows_before + col / width - 1, width);
        }
        (rows_before + col / width, col % width)
    }
}

/// Cut one line into rows of at most `width` characters. An empty line is one empty row.
pub fn wrap_chars(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}
