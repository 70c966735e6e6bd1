//! The line editor's buffer logic: insertion, deletion, cursor motion,
//! bracket/quote pairing, and history — all independent of any actual
//! terminal, so it can be driven and tested without one. [`super::term`]
//! is the thin crossterm glue that feeds real key events into this.

use std::collections::VecDeque;

const HISTORY_CAPACITY: usize = 256;

const OPENERS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}')];

fn matching_close(open: char) -> Option<char> {
    OPENERS.iter().find(|(o, _)| *o == open).map(|(_, c)| *c)
}

fn is_bracket_pair(before: char, after: char) -> bool {
    matching_close(before) == Some(after) || (before == '"' && after == '"')
}

/// A single-line, in-memory editing buffer with history.
pub struct LineEditor {
    buffer: Vec<char>,
    cursor: usize,
    history: VecDeque<String>,
    /// `None` when not currently scrolling through history; `Some(i)`
    /// indexes into `history` (0 = most recently pushed).
    history_cursor: Option<usize>,
    /// The line being edited before history scrolling started, restored
    /// on scrolling back past the newest entry.
    draft: Option<String>,
}

impl LineEditor {
    /// A fresh editor with an empty buffer and no history.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            history: VecDeque::new(),
            history_cursor: None,
            draft: None,
        }
    }

    /// The buffer's current contents as a string.
    pub fn line(&self) -> String {
        self.buffer.iter().collect()
    }

    /// The cursor's position, in characters from the start of the line.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn reset_history_scroll(&mut self) {
        self.history_cursor = None;
        self.draft = None;
    }

    /// Inserts `s` at the cursor, advancing the cursor past it.
    pub fn insert_str(&mut self, s: &str) {
        self.reset_history_scroll();
        for (i, c) in s.chars().enumerate() {
            self.buffer.insert(self.cursor + i, c);
        }
        self.cursor += s.chars().count();
    }

    /// Inserts a single character. An opening bracket or quote inserts
    /// its matching close as well, leaving the cursor between the two.
    pub fn insert_char(&mut self, c: char) {
        self.reset_history_scroll();
        if let Some(close) = matching_close(c) {
            self.buffer.insert(self.cursor, c);
            self.buffer.insert(self.cursor + 1, close);
            self.cursor += 1;
            return;
        }
        if c == '"' {
            self.buffer.insert(self.cursor, c);
            self.buffer.insert(self.cursor + 1, c);
            self.cursor += 1;
            return;
        }
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
    }

    /// Deletes the byte before the cursor. If the cursor sits directly
    /// between a bracket or quote pair (`()`, `[]`, `{}`, `""`), both
    /// sides are deleted together.
    pub fn backspace(&mut self) {
        self.reset_history_scroll();
        if self.cursor == 0 {
            return;
        }
        let before = self.buffer[self.cursor - 1];
        let after = self.buffer.get(self.cursor).copied();
        if let Some(after) = after {
            if is_bracket_pair(before, after) {
                self.buffer.remove(self.cursor);
                self.buffer.remove(self.cursor - 1);
                self.cursor -= 1;
                return;
            }
        }
        self.buffer.remove(self.cursor - 1);
        self.cursor -= 1;
    }

    /// Deletes the character at the cursor, if any.
    pub fn delete(&mut self) {
        self.reset_history_scroll();
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    /// Moves the cursor one column left, if not already at the start.
    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Moves the cursor one column right, if not already at the end.
    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            self.cursor += 1;
        }
    }

    /// Moves the cursor to the start of the line.
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Moves the cursor to the end of the line.
    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    /// Moves the cursor left to the previous space-delimited word
    /// boundary.
    pub fn move_word_left(&mut self) {
        let mut i = self.cursor;
        while i > 0 && self.buffer[i - 1] == ' ' {
            i -= 1;
        }
        while i > 0 && self.buffer[i - 1] != ' ' {
            i -= 1;
        }
        self.cursor = i;
    }

    /// Moves the cursor right to the next space-delimited word
    /// boundary.
    pub fn move_word_right(&mut self) {
        let len = self.buffer.len();
        let mut i = self.cursor;
        while i < len && self.buffer[i] == ' ' {
            i += 1;
        }
        while i < len && self.buffer[i] != ' ' {
            i += 1;
        }
        self.cursor = i;
    }

    /// Deletes backward from the cursor to the previous word boundary.
    pub fn delete_word_left(&mut self) {
        self.reset_history_scroll();
        let start = self.cursor;
        self.move_word_left();
        let end = self.cursor;
        self.buffer.drain(end..start);
    }

    /// Deletes forward from the cursor to the next word boundary.
    pub fn delete_word_right(&mut self) {
        self.reset_history_scroll();
        let start = self.cursor;
        self.move_word_right();
        let end = self.cursor;
        self.cursor = start;
        self.buffer.drain(start..end);
    }

    /// Scrolls to the previous (older) history entry, placing the
    /// cursor at the end of the replaced line. On first press, stashes
    /// the in-progress line so scrolling back down can restore it.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next_index = match self.history_cursor {
            None => {
                self.draft = Some(self.line());
                0
            }
            Some(i) if i + 1 < self.history.len() => i + 1,
            Some(i) => i,
        };
        self.history_cursor = Some(next_index);
        self.buffer = self.history[next_index].chars().collect();
        self.cursor = self.buffer.len();
    }

    /// Scrolls to the next (newer) history entry, or restores the
    /// stashed in-progress line once past the newest entry.
    pub fn history_next(&mut self) {
        match self.history_cursor {
            None => {}
            Some(0) => {
                self.history_cursor = None;
                self.buffer = self.draft.take().unwrap_or_default().chars().collect();
                self.cursor = self.buffer.len();
            }
            Some(i) => {
                self.history_cursor = Some(i - 1);
                self.buffer = self.history[i - 1].chars().collect();
                self.cursor = self.buffer.len();
            }
        }
    }

    /// Submits the current line: if non-empty, pushes it onto history
    /// (evicting the oldest entry past [`HISTORY_CAPACITY`]), clears
    /// the buffer, and returns the submitted text.
    pub fn submit(&mut self) -> String {
        let line = self.line();
        if !line.is_empty() {
            self.history.push_front(line.clone());
            while self.history.len() > HISTORY_CAPACITY {
                self.history.pop_back();
            }
        }
        self.buffer.clear();
        self.cursor = 0;
        self.reset_history_scroll();
        line
    }

    /// The `"> " + line` text the terminal redraws after every action.
    pub fn render(&self) -> String {
        format!("> {}", self.line())
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserting_a_paren_also_inserts_its_close() {
        let mut e = LineEditor::new();
        e.insert_char('(');
        assert_eq!(e.line(), "()");
        assert_eq!(e.cursor(), 1);
    }

    #[test]
    fn inserting_a_quote_pairs_it() {
        let mut e = LineEditor::new();
        e.insert_char('"');
        assert_eq!(e.line(), "\"\"");
        assert_eq!(e.cursor(), 1);
    }

    #[test]
    fn backspace_deletes_an_empty_bracket_pair_together() {
        let mut e = LineEditor::new();
        e.insert_char('(');
        e.backspace();
        assert_eq!(e.line(), "");
        assert_eq!(e.cursor(), 0);
    }

    #[test]
    fn backspace_on_non_pair_deletes_one_char() {
        let mut e = LineEditor::new();
        e.insert_str("(+ 1 2)");
        e.move_left(); // cursor between '2' and ')'
        e.backspace();
        assert_eq!(e.line(), "(+ 1 )");
    }

    #[test]
    fn word_motion_stops_at_spaces() {
        let mut e = LineEditor::new();
        e.insert_str("foo bar baz");
        e.move_home();
        e.move_word_right();
        assert_eq!(e.cursor(), 3);
        e.move_word_right();
        assert_eq!(e.cursor(), 7);
        e.move_word_left();
        assert_eq!(e.cursor(), 4);
    }

    #[test]
    fn delete_word_left_removes_the_previous_word() {
        let mut e = LineEditor::new();
        e.insert_str("foo bar");
        e.delete_word_left();
        assert_eq!(e.line(), "foo ");
    }

    #[test]
    fn delete_word_right_removes_the_next_word() {
        let mut e = LineEditor::new();
        e.insert_str("foo bar");
        e.move_home();
        e.delete_word_right();
        assert_eq!(e.line(), " bar");
    }

    #[test]
    fn submit_pushes_nonempty_lines_to_history_and_clears_buffer() {
        let mut e = LineEditor::new();
        e.insert_str("(+ 1 1)");
        let submitted = e.submit();
        assert_eq!(submitted, "(+ 1 1)");
        assert_eq!(e.line(), "");
        assert_eq!(e.cursor(), 0);
    }

    #[test]
    fn submit_ignores_empty_lines_for_history() {
        let mut e = LineEditor::new();
        e.submit();
        e.insert_str("x");
        e.history_prev();
        assert_eq!(e.line(), "x");
    }

    #[test]
    fn history_prev_then_next_restores_the_draft_line() {
        let mut e = LineEditor::new();
        e.insert_str("(inc 1)");
        e.submit();
        e.insert_str("draft");
        e.history_prev();
        assert_eq!(e.line(), "(inc 1)");
        e.history_next();
        assert_eq!(e.line(), "draft");
    }

    #[test]
    fn history_ring_evicts_oldest_past_capacity() {
        let mut e = LineEditor::new();
        for i in 0..(HISTORY_CAPACITY + 5) {
            e.insert_str(&i.to_string());
            e.submit();
        }
        assert_eq!(e.history.len(), HISTORY_CAPACITY);
        assert_eq!(e.history.back().unwrap(), "5");
    }

    #[test]
    fn render_prefixes_the_prompt() {
        let mut e = LineEditor::new();
        e.insert_str("(+ 1 1)");
        assert_eq!(e.render(), "> (+ 1 1)");
    }
}
