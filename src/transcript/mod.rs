//! Client-side transcript of turns.
//!
//! Turn indices are assigned from a sequence counter starting at 0. Purging
//! from index `i` drops every later turn and rewinds the counter to `i`, so
//! the next request becomes turn `i` again.

use tracing::debug;

/// One request and what the host produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub index: usize,
    pub prompt: String,
    pub output: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    next_index: usize,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new turn and returns its index.
    pub fn push_turn(&mut self, prompt: impl Into<String>) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.turns.push(Turn {
            index,
            prompt: prompt.into(),
            output: String::new(),
            error: None,
        });
        index
    }

    /// Appends output to the latest turn, opening an untitled one if needed.
    pub fn append_output(&mut self, text: &str) -> usize {
        if self.turns.is_empty() {
            self.push_turn("");
        }
        let turn = self.latest_mut();
        turn.output.push_str(text);
        turn.index
    }

    /// Records an error on the latest turn, if there is one.
    pub fn record_error(&mut self, message: &str) -> Option<usize> {
        let turn = self.turns.last_mut()?;
        turn.error = Some(message.to_string());
        Some(turn.index)
    }

    /// Drops every turn with index `>= index`. Returns how many were dropped.
    pub fn purge_from(&mut self, index: usize) -> usize {
        let before = self.turns.len();
        self.turns.retain(|turn| turn.index < index);
        self.next_index = self.next_index.min(index);
        let purged = before - self.turns.len();
        debug!(from = index, purged, "Transcript purged");
        purged
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.index == index)
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.next_index = 0;
    }

    fn latest_mut(&mut self) -> &mut Turn {
        let last = self.turns.len() - 1;
        &mut self.turns[last]
    }
}
