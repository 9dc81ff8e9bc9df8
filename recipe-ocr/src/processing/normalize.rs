//! The ordered cleanup stages applied by [`super::process_text`].
//!
//! Each stage is a pure `&str -> String` function. Later stages rely on the
//! output shape of earlier ones (single spaces, `\n` line endings, canonical
//! unit words), so the order in `process_text` matters.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static SPACE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("valid regex"));
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Garbled spellings seen in recipe photos, keyed by lowercase form.
const GARBLED_TOKENS: &[(&str, &str)] = &[
    ("1ngred1ents", "ingredients"),
    ("ingred1ents", "ingredients"),
    ("1ngredients", "ingredients"),
    ("d1rect1ons", "directions"),
    ("direct1ons", "directions"),
    ("1nstruct1ons", "instructions"),
    ("instruct1ons", "instructions"),
    ("ch1ps", "chips"),
    ("ch1p", "chip"),
    ("c00k1es", "cookies"),
    ("c00k1e", "cookie"),
    ("c00kies", "cookies"),
    ("f10ur", "flour"),
    ("fl0ur", "flour"),
    ("sa1t", "salt"),
    ("0ven", "oven"),
    ("m1x", "mix"),
    ("m1lk", "milk"),
    ("rnilk", "milk"),
    ("crearn", "cream"),
    ("ternperature", "temperature"),
    ("rninutes", "minutes"),
    ("bak1ng", "baking"),
    ("p0wder", "powder"),
    ("s0da", "soda"),
    ("vani11a", "vanilla"),
    ("0il", "oil"),
    ("egg5", "eggs"),
];

static GARBLED_LOOKUP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| GARBLED_TOKENS.iter().copied().collect());

static GARBLED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = GARBLED_TOKENS
        .iter()
        .map(|(garbled, _)| regex::escape(garbled))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid regex")
});

/// Abbreviations are matched as whole words, or glued to a leading quantity
/// (`2tbsp`), which is kept.
static UNIT_ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b|(?P<qty>\d))(?P<unit>tbsp|tsp|mins|min|hrs|hr)\b").expect("valid regex")
});

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(ingredients|directions|instructions|method|preparation)\b:?")
        .expect("valid regex")
});
static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[•*\-][ \t]*").expect("valid regex"));
static NUMBERED_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d{1,3})\)[ \t]*").expect("valid regex"));
// `1.5 cups` is a quantity, not a step number, hence the non-digit requirement.
static NUMBERED_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d{1,3})\.[ \t]*([^\d\s])").expect("valid regex"));
static DIGIT_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d)(cups?|tablespoons?|teaspoons?|ounces?|pounds?|grams?|oz|lbs?|kg|g|ml|minutes|hours)\b",
    )
    .expect("valid regex")
});

static REPEATED_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid regex"));
static REPEATED_BANGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!{2,}").expect("valid regex"));
static REPEATED_QUESTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?{2,}").expect("valid regex"));
static NON_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex"));
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d.)\-*•]").expect("valid regex"));

/// Unify line endings, collapse horizontal whitespace, trim around line
/// breaks and keep at most one blank line in a row.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = SPACE_RUN.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    BLANK_LINE_RUN.replace_all(&text, "\n\n").into_owned()
}

/// Repair digit/letter confusions and canonicalize unit abbreviations.
pub fn fix_ocr_errors(text: &str) -> String {
    let text = GARBLED_TOKEN.replace_all(text, |caps: &Captures| {
        let found = &caps[0];
        match GARBLED_LOOKUP.get(found.to_lowercase().as_str()) {
            Some(fixed) => match_case(found, fixed),
            None => found.to_string(),
        }
    });

    let text = fix_letter_flanked_digits(&text);

    UNIT_ABBREVIATION
        .replace_all(&text, |caps: &Captures| {
            let qty = caps.name("qty").map_or("", |m| m.as_str());
            format!("{qty}{}", canonical_unit(&caps["unit"]))
        })
        .into_owned()
}

fn canonical_unit(abbreviation: &str) -> &'static str {
    match abbreviation.to_lowercase().as_str() {
        "tbsp" => "tablespoon",
        "tsp" => "teaspoon",
        "min" | "mins" => "minutes",
        _ => "hours",
    }
}

fn digit_lookalike(c: char) -> Option<char> {
    match c {
        '0' => Some('o'),
        '1' => Some('l'),
        '5' => Some('S'),
        '8' => Some('B'),
        _ => None,
    }
}

/// Replace a lookalike digit only when both neighbours are letters, so
/// quantities such as `2 cups` or `350F` are left alone.
fn fix_letter_flanked_digits(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();

    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let Some(letter) = digit_lookalike(c) else {
                return c;
            };
            let before = i > 0 && chars[i - 1].is_alphabetic();
            let after = chars.get(i + 1).is_some_and(|next| next.is_alphabetic());
            if before && after {
                letter
            } else {
                c
            }
        })
        .collect()
}

/// Carry the capitalisation of `original` over to `replacement`.
fn match_case(original: &str, replacement: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }

    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }

    replacement.to_string()
}

/// Uppercase section headers, unify list markers and separate quantities
/// from their units.
pub fn improve_structure(text: &str) -> String {
    let text = SECTION_HEADER.replace_all(text, |caps: &Captures| {
        format!("{}:", caps[1].to_uppercase())
    });
    let text = BULLET_MARKER.replace_all(&text, "- ");
    let text = NUMBERED_PAREN.replace_all(&text, "${1}. ");
    let text = NUMBERED_DOT.replace_all(&text, "${1}. ${2}");
    DIGIT_UNIT.replace_all(&text, "${1} ${2}").into_owned()
}

/// Strip everything but letters, digits and whitespace, then drop lines that
/// are too short to carry content.
///
/// This deliberately also removes the list markers and colons written by
/// [`improve_structure`].
pub fn remove_noise(text: &str) -> String {
    let text = REPEATED_DOTS.replace_all(text, "...");
    let text = REPEATED_BANGS.replace_all(&text, "!");
    let text = REPEATED_QUESTIONS.replace_all(&text, "?");
    let text = NON_TEXT.replace_all(&text, "");

    text.lines()
        .map(|line| SPACE_RUN.replace_all(line.trim(), " ").into_owned())
        .filter(|line| line.chars().count() > 1 || LIST_MARKER.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}
