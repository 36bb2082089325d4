/// Telegram rejects callback data above this many bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn callback(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// A MarkdownV2 message with an optional inline keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl OutboundMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_keyboard(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.keyboard.extend(rows);
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.keyboard.iter().flatten()
    }
}

pub fn chunk(buttons: Vec<Button>, size: usize) -> Vec<Vec<Button>> {
    let size = size.max(1);
    let mut rows = Vec::with_capacity(buttons.len().div_ceil(size));
    let mut row = Vec::with_capacity(size);

    for button in buttons {
        row.push(button);
        if row.len() == size {
            rows.push(std::mem::replace(&mut row, Vec::with_capacity(size)));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}
