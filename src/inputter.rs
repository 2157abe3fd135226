use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor backing the search box.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        let result = match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (kc, km) => self.key(kc, km),
        };
        trace!("Input {:?} => {:?}", key.code, result);
        result
    }

    /// Replaces the input and places the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = s.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let idx = self.getbytepos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.char_count() {
            let idx = self.getbytepos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.char_count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.char_count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            let idx = self.getbytepos();
            self.current_input.insert(idx, chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    fn getbytepos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(inputter: &mut Inputter, code: KeyCode) -> InputResult {
        inputter.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(inputter: &mut Inputter, s: &str) -> InputResult {
        let mut last = inputter.get();
        for c in s.chars() {
            last = press(inputter, KeyCode::Char(c));
        }
        last
    }

    #[test]
    fn typing_appends() {
        let mut input = Inputter::default();
        let result = type_str(&mut input, "bob");
        assert_eq!(result.input, "bob");
        assert_eq!(result.curser_pos, 3);
        assert!(!result.finished);
    }

    #[test]
    fn shifted_chars_are_typed() {
        let mut input = Inputter::default();
        let result = input.read(KeyEvent::new(KeyCode::Char('B'), KeyModifiers::SHIFT));
        assert_eq!(result.input, "B");
    }

    #[test]
    fn insert_and_backspace_at_cursor() {
        let mut input = Inputter::default();
        type_str(&mut input, "ac");
        press(&mut input, KeyCode::Left);
        let result = type_str(&mut input, "b");
        assert_eq!(result.input, "abc");
        assert_eq!(result.curser_pos, 2);

        let result = press(&mut input, KeyCode::Backspace);
        assert_eq!(result.input, "ac");
        assert_eq!(result.curser_pos, 1);

        let result = press(&mut input, KeyCode::Delete);
        assert_eq!(result.input, "a");
    }

    #[test]
    fn multibyte_chars() {
        let mut input = Inputter::default();
        type_str(&mut input, "zoë");
        let result = press(&mut input, KeyCode::Backspace);
        assert_eq!(result.input, "zo");
        press(&mut input, KeyCode::Home);
        let result = type_str(&mut input, "ñ");
        assert_eq!(result.input, "ñzo");
    }

    #[test]
    fn enter_finishes() {
        let mut input = Inputter::default();
        type_str(&mut input, "ann");
        let result = press(&mut input, KeyCode::Enter);
        assert!(result.finished);
        assert!(!result.canceled);
        assert_eq!(result.input, "ann");
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut input = Inputter::default();
        type_str(&mut input, "ann");
        let result = press(&mut input, KeyCode::Esc);
        assert!(result.finished);
        assert!(result.canceled);
        assert!(result.input.is_empty());
    }

    #[test]
    fn set_moves_cursor_to_end() {
        let mut input = Inputter::default();
        input.set("héllo");
        assert_eq!(input.get().curser_pos, 5);
        let result = type_str(&mut input, "!");
        assert_eq!(result.input, "héllo!");
    }
}
