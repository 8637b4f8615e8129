use serde::{Deserialize, Serialize};

const ROMAN_NUMERALS: &[(u32, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Symbol-font and Wingdings private-use glyphs Word stores in bullet level text.
const BULLET_GLYPHS: &[(char, char)] = &[
    ('\u{F0B7}', '•'),
    ('\u{F0A7}', '▪'),
    ('\u{F06E}', '■'),
    ('\u{F0D8}', '➢'),
    ('\u{F076}', '❖'),
    ('\u{F0FC}', '✓'),
    ('\u{F0A8}', '◦'),
];

/// Number format of a numbering level (`<w:numFmt w:val="..."/>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFormat {
    #[default]
    Decimal,
    DecimalZero,
    UpperRoman,
    LowerRoman,
    UpperLetter,
    LowerLetter,
    Ordinal,
    Bullet,
    None,
}

impl NumberFormat {
    /// Maps a `w:numFmt` value; unrecognized formats render as decimal.
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "decimalZero" => Self::DecimalZero,
            "upperRoman" => Self::UpperRoman,
            "lowerRoman" => Self::LowerRoman,
            "upperLetter" => Self::UpperLetter,
            "lowerLetter" => Self::LowerLetter,
            "ordinal" => Self::Ordinal,
            "bullet" => Self::Bullet,
            "none" => Self::None,
            _ => Self::Decimal,
        }
    }

    /// Renders `value` in this format. Bullet and `none` levels render no number.
    pub fn format(self, value: u32) -> String {
        match self {
            Self::Decimal => value.to_string(),
            Self::DecimalZero => format!("{value:02}"),
            Self::UpperRoman => to_roman(value).unwrap_or_else(|| value.to_string()),
            Self::LowerRoman => to_roman(value)
                .map_or_else(|| value.to_string(), |roman| roman.to_lowercase()),
            Self::UpperLetter => to_letters(value, b'A').unwrap_or_else(|| value.to_string()),
            Self::LowerLetter => to_letters(value, b'a').unwrap_or_else(|| value.to_string()),
            Self::Ordinal => to_ordinal(value),
            Self::Bullet | Self::None => String::new(),
        }
    }
}

fn to_roman(mut value: u32) -> Option<String> {
    if value == 0 {
        return None;
    }
    let mut output = String::new();
    for &(weight, numeral) in ROMAN_NUMERALS {
        while value >= weight {
            output.push_str(numeral);
            value -= weight;
        }
    }
    Some(output)
}

/// Word's alphabetic scheme: a..z, then aa..zz, then aaa..
fn to_letters(value: u32, base: u8) -> Option<String> {
    if value == 0 {
        return None;
    }
    let index = (value - 1) % 26;
    let repeat = (value - 1) / 26 + 1;
    let letter = char::from(base + u8::try_from(index).ok()?);
    Some(std::iter::repeat_n(letter, usize::try_from(repeat).ok()?).collect())
}

fn to_ordinal(value: u32) -> String {
    let suffix = match (value % 10, value % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{value}{suffix}")
}

/// Replaces private-use bullet glyphs with their Unicode equivalents.
pub fn normalize_bullet(text: &str) -> String {
    text.chars()
        .map(|ch| {
            BULLET_GLYPHS
                .iter()
                .find(|(glyph, _)| *glyph == ch)
                .map_or(ch, |(_, replacement)| *replacement)
        })
        .collect()
}
