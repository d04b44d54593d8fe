use std::collections::HashMap;

/// Register payload type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterType {
    /// Character-wise (inline) content
    Charwise,
    /// Line-wise content; text always carries a trailing newline
    Linewise,
}

/// A register payload: the text plus how it should be pasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterContent {
    pub text: String,
    pub kind: RegisterType,
}

impl RegisterContent {
    pub fn charwise(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: RegisterType::Charwise }
    }

    /// Linewise payloads produced by line-oriented commands always end with
    /// a trailing separator.
    pub fn linewise(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self { text, kind: RegisterType::Linewise }
    }

    pub fn is_linewise(&self) -> bool {
        self.kind == RegisterType::Linewise
    }
}

/// The system clipboard consumed as a plain read/write string service. The
/// `+` and `*` registers route through this boundary.
pub trait Clipboard {
    fn get_text(&mut self) -> Option<String>;
    fn set_text(&mut self, text: &str);
}

/// Clipboard backed by the OS via arboard. Errors are swallowed: a missing
/// clipboard must never fail an editing command.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn get_text(&mut self) -> Option<String> {
        let mut cb = arboard::Clipboard::new().ok()?;
        cb.get_text().ok().filter(|t| !t.is_empty())
    }

    fn set_text(&mut self, text: &str) {
        if let Ok(mut cb) = arboard::Clipboard::new() {
            let _ = cb.set_text(text.to_string());
        }
    }
}

/// In-memory clipboard for tests and clipboard-less environments.
#[derive(Default)]
pub struct MemoryClipboard(pub Option<String>);

impl Clipboard for MemoryClipboard {
    fn get_text(&mut self) -> Option<String> {
        self.0.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.0 = Some(text.to_string());
    }
}

pub fn is_black_hole(name: Option<char>) -> bool {
    matches!(name, Some('_'))
}

pub fn is_clipboard(name: Option<char>) -> bool {
    matches!(name, Some('+') | Some('*'))
}

pub fn is_valid_register(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '"' | '-' | '+' | '*' | '_')
}

/// Vim-style register bank.
pub struct Registers {
    /// Named registers (a-z)
    named: HashMap<char, RegisterContent>,
    /// Unnamed register (default for yank/delete)
    unnamed: Option<RegisterContent>,
    /// Last-yank register ("0")
    last_yank: Option<RegisterContent>,
    /// Small delete register ("-"), for deletes of less than one line
    small_delete: Option<RegisterContent>,
    /// Numbered delete ring "1".."9"; index 0 is the most recent delete
    numbered: [Option<RegisterContent>; 9],
    clipboard: Box<dyn Clipboard>,
}

impl Registers {
    pub fn new(clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            named: HashMap::new(),
            unnamed: None,
            last_yank: None,
            small_delete: None,
            numbered: Default::default(),
            clipboard,
        }
    }

    /// Read a register, including the clipboard registers.
    pub fn get(&mut self, name: Option<char>) -> Option<RegisterContent> {
        match name {
            None | Some('"') => self.unnamed.clone(),
            Some('0') => self.last_yank.clone(),
            Some('-') => self.small_delete.clone(),
            Some('_') => None,
            Some('+') | Some('*') => self.clipboard.get_text().map(|text| {
                if text.ends_with('\n') {
                    RegisterContent::linewise(text)
                } else {
                    RegisterContent::charwise(text)
                }
            }),
            Some(c @ 'a'..='z') | Some(c @ 'A'..='Z') => {
                self.named.get(&c.to_ascii_lowercase()).cloned()
            }
            Some(c @ '1'..='9') => {
                let idx = c.to_digit(10).unwrap() as usize - 1;
                self.numbered[idx].clone()
            }
            _ => None,
        }
    }

    /// Store into a named register. Uppercase names append to the lowercase
    /// base; the payload type is taken from the new write. Returns the merged
    /// content that ended up in the register.
    fn set_named(&mut self, name: char, content: RegisterContent) -> RegisterContent {
        let lower = name.to_ascii_lowercase();
        let merged = if name.is_ascii_uppercase() {
            match self.named.get(&lower) {
                Some(existing) => {
                    let mut text = existing.text.clone();
                    if existing.is_linewise() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str(&content.text);
                    RegisterContent { text, kind: content.kind }
                }
                None => content,
            }
        } else {
            content
        };
        self.named.insert(lower, merged.clone());
        merged
    }

    /// Record a yank. Mirrors into the unnamed register and "0", except for
    /// the black hole which discards everything.
    pub fn yank(&mut self, name: Option<char>, content: RegisterContent) {
        if is_black_hole(name) {
            return;
        }
        if is_clipboard(name) {
            self.clipboard.set_text(&content.text);
            self.unnamed = Some(content);
            return;
        }
        let mirrored = match name {
            Some(c) if c != '"' => self.set_named(c, content),
            _ => content,
        };
        self.last_yank = Some(mirrored.clone());
        self.unnamed = Some(mirrored);
    }

    /// Record a delete or change. Non-small deletes rotate the numbered ring
    /// regardless of a named target; the black hole touches nothing at all.
    pub fn delete(&mut self, name: Option<char>, content: RegisterContent, is_small: bool) {
        if is_black_hole(name) {
            return;
        }
        if is_clipboard(name) {
            self.clipboard.set_text(&content.text);
            self.unnamed = Some(content);
            return;
        }
        if is_small && name.is_none() {
            self.small_delete = Some(content.clone());
        }
        if !is_small {
            for i in (1..9).rev() {
                self.numbered[i] = self.numbered[i - 1].take();
            }
            self.numbered[0] = Some(content.clone());
        }
        let mirrored = match name {
            Some(c) if c != '"' => self.set_named(c, content),
            _ => content,
        };
        self.unnamed = Some(mirrored);
    }
}
