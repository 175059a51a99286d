//! Keyboard chord normalization, recording and matching
//!
//! The recorder and the matcher share `normalize_key`, so a chord recorded
//! from a live keydown always matches the same keydown later on.

use std::fmt;
use std::str::FromStr;

use snapparse_types::KeyEvent;

/// Canonical names accepted in chord strings besides single characters and F-keys
const NAMED_KEYS: [&str; 10] = [
    "Space",
    "Plus",
    "Esc",
    "Enter",
    "Backspace",
    "Delete",
    "Up",
    "Down",
    "Left",
    "Right",
];

const DOM_ALIASES: [(&str, &str); 5] = [
    ("escape", "Esc"),
    ("arrowup", "Up"),
    ("arrowdown", "Down"),
    ("arrowleft", "Left"),
    ("arrowright", "Right"),
];

/// Normalize a DOM-style key name into its chord token
///
/// Returns `None` for keys that can never be part of a chord, including the
/// bare modifier keys themselves. Every token produced here parses back as
/// a chord key, `+` included.
pub fn normalize_key(key: &str) -> Option<String> {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return single_char_key(c);
    }

    let mapped = match key {
        "Escape" => Some("Esc"),
        "Enter" => Some("Enter"),
        "Backspace" => Some("Backspace"),
        "Delete" => Some("Delete"),
        "ArrowUp" => Some("Up"),
        "ArrowDown" => Some("Down"),
        "ArrowLeft" => Some("Left"),
        "ArrowRight" => Some("Right"),
        _ => None,
    };
    if let Some(mapped) = mapped {
        return Some(mapped.to_string());
    }

    function_key(key).map(|n| format!("F{n}"))
}

fn single_char_key(c: char) -> Option<String> {
    match c {
        ' ' => Some("Space".to_string()),
        '+' => Some("Plus".to_string()),
        c if c.is_whitespace() || c.is_control() => None,
        c => {
            // keep characters whose uppercase form is not a single char, e.g. 'ß'
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) => Some(u.to_string()),
                _ => Some(c.to_string()),
            }
        }
    }
}

fn function_key(key: &str) -> Option<u8> {
    let digits = key.strip_prefix('F')?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u8 = digits.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

/// Key token inside a chord string, accepting DOM names as well as canonical ones
fn canonical_token(token: &str) -> Option<String> {
    if let Some(named) = NAMED_KEYS
        .iter()
        .find(|name| name.eq_ignore_ascii_case(token))
    {
        return Some((*named).to_string());
    }

    let lower = token.to_ascii_lowercase();
    if let Some((_, named)) = DOM_ALIASES.iter().find(|(dom, _)| *dom == lower) {
        return Some((*named).to_string());
    }

    if token.len() <= 3
        && let Some(rest) = token.strip_prefix(['f', 'F'])
        && let Some(n) = function_key(&format!("F{rest}"))
    {
        return Some(format!("F{n}"));
    }

    normalize_key(token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            ctrl: event.ctrl,
            shift: event.shift,
            alt: event.alt,
            meta: event.meta,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("hotkey is empty")]
    Empty,

    #[error("hotkey has no non-modifier key")]
    MissingKey,

    #[error("hotkey has more than one key: {0}")]
    MultipleKeys(String),

    #[error("unknown key in hotkey: {0}")]
    UnknownKey(String),
}

/// A parsed `Modifier+...+Key` chord
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    modifiers: Modifiers,
    key: String,
}

impl Chord {
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Record a chord from a live keydown
    ///
    /// Yields `None` while only modifier keys are held, so a chord can never
    /// be stored as a bare modifier.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        let key = normalize_key(&event.key)?;
        Some(Self {
            modifiers: Modifiers::from_event(event),
            key,
        })
    }

    /// Exact modifier set and normalized key must both agree
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if Modifiers::from_event(event) != self.modifiers {
            return false;
        }
        normalize_key(&event.key).is_some_and(|key| key == self.key)
    }
}

impl FromStr for Chord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ChordParseError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key: Option<String> = None;

        for token in s.split('+').map(str::trim) {
            match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                "meta" | "cmd" | "command" | "super" | "win" => modifiers.meta = true,
                _ => {
                    let canonical = canonical_token(token)
                        .ok_or_else(|| ChordParseError::UnknownKey(token.to_string()))?;
                    if key.is_some() {
                        return Err(ChordParseError::MultipleKeys(s.to_string()));
                    }
                    key = Some(canonical);
                }
            }
        }

        let key = key.ok_or(ChordParseError::MissingKey)?;
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.modifiers.ctrl, "Ctrl"),
            (self.modifiers.shift, "Shift"),
            (self.modifiers.alt, "Alt"),
            (self.modifiers.meta, "Meta"),
        ];
        for (_, name) in flags.iter().filter(|(on, _)| *on) {
            write!(f, "{name}+")?;
        }
        f.write_str(&self.key)
    }
}

/// Turn a live keydown into a storable chord string
pub fn record_chord(event: &KeyEvent) -> Option<String> {
    Chord::from_event(event).map(|chord| chord.to_string())
}

/// Test a configured chord string against a keydown; invalid chords never match
pub fn matches_chord(event: &KeyEvent, chord: &str) -> bool {
    chord
        .parse::<Chord>()
        .map(|chord| chord.matches(event))
        .unwrap_or(false)
}
