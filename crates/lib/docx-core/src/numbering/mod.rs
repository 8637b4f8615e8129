//! Numbering model: level rules, list definitions, formats and counters.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub mod counters;
pub mod format;

pub use counters::ListCounters;
pub use format::{NumberFormat, normalize_bullet};

/// What follows the rendered label (`<w:suff w:val="..."/>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelSuffix {
    #[default]
    Tab,
    Space,
    Nothing,
}

impl LevelSuffix {
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "space" => Self::Space,
            "nothing" => Self::Nothing,
            _ => Self::Tab,
        }
    }
}

/// Formatting rule for one level of a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingLevel {
    pub ilvl: u8,
    pub format: NumberFormat,
    /// Level text template, e.g. `%1.%2.` or `(%1)`.
    pub text: String,
    pub start: u32,
    /// `w:lvlRestart`: the 1-based level whose use restarts this one; `0` never restarts.
    pub restart: Option<u8>,
    /// `w:isLgl`: every placeholder renders as decimal.
    pub legal: bool,
    pub suffix: LevelSuffix,
    /// Paragraph style bound to this level (`w:pStyle`).
    pub style_id: Option<String>,
}

impl NumberingLevel {
    /// A decimal level with Word's default `%N.` template.
    pub fn new(ilvl: u8) -> Self {
        Self {
            ilvl,
            format: NumberFormat::Decimal,
            text: format!("%{}.", u16::from(ilvl) + 1),
            start: 1,
            restart: None,
            legal: false,
            suffix: LevelSuffix::Tab,
            style_id: None,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub const fn with_start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub const fn with_restart(mut self, restart: u8) -> Self {
        self.restart = Some(restart);
        self
    }

    /// Whether advancing level `advanced` (0-based) restarts this level.
    pub fn restarts_after(&self, advanced: u8) -> bool {
        match self.restart {
            None => true,
            Some(0) => false,
            Some(level) => u16::from(level) > u16::from(advanced),
        }
    }
}

/// The levels of one list instance (`w:num`), with overrides applied.
pub type ListLevels = BTreeMap<u8, NumberingLevel>;

/// Resolved numbering definitions keyed by list id (`w:numId`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberingDefinitions {
    lists: HashMap<String, ListLevels>,
}

impl NumberingDefinitions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, num_id: impl Into<String>, levels: ListLevels) {
        self.lists.insert(num_id.into(), levels);
    }

    pub fn levels(&self, num_id: &str) -> Option<&ListLevels> {
        self.lists.get(num_id)
    }

    pub fn level(&self, num_id: &str, ilvl: u8) -> Option<&NumberingLevel> {
        self.lists.get(num_id).and_then(|levels| levels.get(&ilvl))
    }

    /// The level of `num_id` bound to paragraph style `style_id`, if any.
    pub fn level_for_style(&self, num_id: &str, style_id: &str) -> Option<u8> {
        self.lists.get(num_id).and_then(|levels| {
            levels
                .values()
                .find(|level| level.style_id.as_deref() == Some(style_id))
                .map(|level| level.ilvl)
        })
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
