use std::collections::{BTreeMap, HashMap};

use super::format::normalize_bullet;
use super::{ListLevels, NumberFormat};

/// Running counters for every list seen during one pass.
///
/// Each list id owns an ordered map from level index to its current value.
/// A level with no entry has not been used since the list began or since a
/// shallower level last restarted it.
#[derive(Debug, Clone, Default)]
pub struct ListCounters {
    lists: HashMap<String, BTreeMap<u8, u32>>,
}

impl ListCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances `ilvl` of `num_id` and restarts deeper levels. Returns the new value.
    pub fn advance(&mut self, num_id: &str, ilvl: u8, levels: &ListLevels) -> u32 {
        let start = levels.get(&ilvl).map_or(1, |level| level.start);
        let counters = self.lists.entry(num_id.to_string()).or_default();
        let value = counters
            .get(&ilvl)
            .map_or(start, |current| current.saturating_add(1));
        counters.insert(ilvl, value);

        counters.retain(|&deeper, _| {
            deeper <= ilvl
                || !levels
                    .get(&deeper)
                    .is_none_or(|level| level.restarts_after(ilvl))
        });
        value
    }

    pub fn current(&self, num_id: &str, ilvl: u8) -> Option<u32> {
        self.lists
            .get(num_id)
            .and_then(|counters| counters.get(&ilvl))
            .copied()
    }

    /// Renders the label for `ilvl` of `num_id` from the current counter values.
    ///
    /// `%1`..`%9` are replaced with the value of the matching level, or that
    /// level's start value when it has not been used yet.
    pub fn render(&self, num_id: &str, ilvl: u8, levels: &ListLevels) -> String {
        let Some(level) = levels.get(&ilvl) else {
            return String::new();
        };
        if level.format == NumberFormat::Bullet {
            return normalize_bullet(&level.text);
        }

        let mut label = String::with_capacity(level.text.len());
        let mut chars = level.text.chars().peekable();
        while let Some(ch) = chars.next() {
            let placeholder = chars
                .peek()
                .and_then(|next| next.to_digit(10))
                .filter(|digit| (1..=9).contains(digit));
            match (ch, placeholder) {
                ('%', Some(digit)) => {
                    chars.next();
                    let target = u8::try_from(digit - 1).unwrap_or_default();
                    label.push_str(&self.render_placeholder(num_id, target, level.legal, levels));
                }
                _ => label.push(ch),
            }
        }
        label
    }

    fn render_placeholder(&self, num_id: &str, target: u8, legal: bool, levels: &ListLevels) -> String {
        let rule = levels.get(&target);
        let value = self
            .current(num_id, target)
            .or_else(|| rule.map(|level| level.start))
            .unwrap_or(1);
        let format = rule.map_or(NumberFormat::Decimal, |level| level.format);
        match format {
            NumberFormat::Bullet | NumberFormat::None => String::new(),
            _ if legal => NumberFormat::Decimal.format(value),
            format => format.format(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbering::NumberingLevel;

    fn outline() -> ListLevels {
        ListLevels::from([
            (0, NumberingLevel::new(0)),
            (
                1,
                NumberingLevel::new(1)
                    .with_format(NumberFormat::LowerLetter)
                    .with_text("%1.%2)"),
            ),
            (
                2,
                NumberingLevel::new(2)
                    .with_format(NumberFormat::LowerRoman)
                    .with_text("(%3)")
                    .with_restart(1),
            ),
        ])
    }

    #[test]
    fn flat_list_counts_from_start() {
        let levels = ListLevels::from([(0, NumberingLevel::new(0).with_start(3))]);
        let mut counters = ListCounters::new();
        let labels: Vec<_> = (0..3)
            .map(|_| {
                counters.advance("1", 0, &levels);
                counters.render("1", 0, &levels)
            })
            .collect();
        assert_eq!(labels, ["3.", "4.", "5."]);
    }

    #[test]
    fn shallower_level_restarts_deeper_levels() {
        let levels = outline();
        let mut counters = ListCounters::new();
        counters.advance("1", 0, &levels);
        counters.advance("1", 1, &levels);
        counters.advance("1", 1, &levels);
        assert_eq!(counters.render("1", 1, &levels), "1.b)");

        counters.advance("1", 0, &levels);
        counters.advance("1", 1, &levels);
        assert_eq!(counters.render("1", 1, &levels), "2.a)");
    }

    #[test]
    fn restart_level_limits_resets() {
        let levels = outline();
        let mut counters = ListCounters::new();
        counters.advance("1", 0, &levels);
        counters.advance("1", 2, &levels);
        counters.advance("1", 1, &levels);
        counters.advance("1", 2, &levels);
        assert_eq!(counters.render("1", 2, &levels), "(ii)");

        counters.advance("1", 0, &levels);
        counters.advance("1", 2, &levels);
        assert_eq!(counters.render("1", 2, &levels), "(i)");
    }

    #[test]
    fn lists_count_independently() {
        let levels = outline();
        let mut counters = ListCounters::new();
        counters.advance("1", 0, &levels);
        counters.advance("1", 0, &levels);
        counters.advance("2", 0, &levels);
        assert_eq!(counters.current("1", 0), Some(2));
        assert_eq!(counters.current("2", 0), Some(1));
    }

    #[test]
    fn legal_numbering_renders_decimal() {
        let mut levels = outline();
        if let Some(level) = levels.get_mut(&1) {
            level.legal = true;
        }
        let mut counters = ListCounters::new();
        counters.advance("1", 0, &levels);
        counters.advance("1", 1, &levels);
        counters.advance("1", 1, &levels);
        assert_eq!(counters.render("1", 1, &levels), "1.2)");
    }

    #[test]
    fn bullets_render_level_text() {
        let levels = ListLevels::from([(
            0,
            NumberingLevel::new(0)
                .with_format(NumberFormat::Bullet)
                .with_text("\u{F0B7}"),
        )]);
        let mut counters = ListCounters::new();
        counters.advance("7", 0, &levels);
        assert_eq!(counters.render("7", 0, &levels), "•");
    }
}
