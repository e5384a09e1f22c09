//! German verbalizers.

use regex::Regex;
use std::sync::LazyLock;

use crate::transform::{stateless_transform, TextTransform};

const ONES: [&str; 20] = [
    "null", "eins", "zwei", "drei", "vier", "fünf", "sechs", "sieben", "acht", "neun", "zehn", "elf", "zwölf", "dreizehn",
    "vierzehn", "fünfzehn", "sechzehn", "siebzehn", "achtzehn", "neunzehn",
];
const TENS: [&str; 10] = ["", "", "zwanzig", "dreißig", "vierzig", "fünfzig", "sechzig", "siebzig", "achtzig", "neunzig"];

fn below_hundred(n: u64) -> String {
    if n < 20 {
        ONES[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        // German reads the ones digit before the tens: "einundzwanzig".
        format!("{}und{}", ONES[(n % 10) as usize], TENS[(n / 10) as usize])
    }
}

fn below_thousand(n: u64) -> String {
    if n < 100 {
        return below_hundred(n);
    }
    let hundreds = n / 100;
    let rest = n % 100;
    let hundreds_word = if hundreds == 1 { "einhundert".to_string() } else { format!("{}hundert", ONES[hundreds as usize]) };
    if rest == 0 {
        hundreds_word
    } else {
        format!("{hundreds_word}{}", below_hundred(rest))
    }
}

/// Spells out an integer, e.g. `1205` -> `eintausendzweihundertfünf`.
pub fn cardinal_to_words(n: i64) -> String {
    if n == 0 {
        return "null".to_string();
    }
    let negative = n < 0;
    let mut n = n.unsigned_abs();
    let mut groups: Vec<String> = Vec::new();
    let scales = ["", "tausend", "million", "milliarde"];
    let mut idx = 0;
    while n > 0 {
        let group = n % 1000;
        if group != 0 {
            let word = if idx == 0 {
                below_thousand(group)
            } else if group == 1 {
                format!("ein{}", scales[idx])
            } else {
                format!("{}{}", below_thousand(group), scales[idx])
            };
            groups.push(word);
        }
        n /= 1000;
        idx += 1;
    }
    groups.reverse();
    let words = groups.join("");
    if negative {
        format!("minus {words}")
    } else {
        words
    }
}

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\b\d+\b").unwrap());
static CURRENCY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s?€|€\s?(\d+)").unwrap());
static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\s?%").unwrap());
static DISTANCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\s?(km|mi|m)\b").unwrap());
static WEIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\s?(kg|lb|g)\b").unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

const MONTHS: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September", "Oktober", "November", "Dezember",
];

pub fn verbalize_numbers(text: &str) -> String {
    INTEGER
        .replace_all(text, |caps: &regex::Captures| cardinal_to_words(caps[0].parse().unwrap_or(0)))
        .into_owned()
}

/// `12€` / `€12` -> `zwölf Euro`.
pub fn verbalize_currency(text: &str) -> String {
    CURRENCY
        .replace_all(text, |caps: &regex::Captures| {
            let amount = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("0");
            let n: i64 = amount.parse().unwrap_or(0);
            format!("{} Euro", cardinal_to_words(n))
        })
        .into_owned()
}

/// `42%` -> `zweiundvierzig Prozent`.
pub fn verbalize_percentage(text: &str) -> String {
    PERCENTAGE
        .replace_all(text, |caps: &regex::Captures| format!("{} Prozent", cardinal_to_words(caps[1].parse().unwrap_or(0))))
        .into_owned()
}

/// `5km` -> `fünf Kilometer`.
pub fn verbalize_distance(text: &str) -> String {
    DISTANCE
        .replace_all(text, |caps: &regex::Captures| {
            let n: i64 = caps[1].parse().unwrap_or(0);
            let unit = match &caps[2] {
                "km" => "Kilometer",
                "mi" => "Meile",
                _ => "Meter",
            };
            let plural = if n == 1 || unit == "Kilometer" || unit == "Meter" { "" } else { "n" };
            format!("{} {unit}{plural}", cardinal_to_words(n))
        })
        .into_owned()
}

/// `5kg` -> `fünf Kilogramm`.
pub fn verbalize_weight(text: &str) -> String {
    WEIGHT
        .replace_all(text, |caps: &regex::Captures| {
            let n: i64 = caps[1].parse().unwrap_or(0);
            let unit = match &caps[2] {
                "kg" => "Kilogramm",
                "lb" => "Pfund",
                _ => "Gramm",
            };
            format!("{} {unit}", cardinal_to_words(n))
        })
        .into_owned()
}

/// `2024-01-15` -> `15. Januar 2024`.
pub fn verbalize_date(text: &str) -> String {
    ISO_DATE
        .replace_all(text, |caps: &regex::Captures| {
            let year = &caps[1];
            let month: usize = caps[2].parse().unwrap_or(1);
            let day = &caps[3];
            let month_name = MONTHS.get(month.saturating_sub(1)).copied().unwrap_or("Januar");
            format!("{}. {month_name} {year}", day.trim_start_matches('0'))
        })
        .into_owned()
}

pub fn number_transform() -> TextTransform {
    stateless_transform(verbalize_numbers)
}

pub fn currency_transform() -> TextTransform {
    stateless_transform(verbalize_currency)
}

pub fn percentage_transform() -> TextTransform {
    stateless_transform(verbalize_percentage)
}

pub fn distance_transform() -> TextTransform {
    stateless_transform(verbalize_distance)
}

pub fn weight_transform() -> TextTransform {
    stateless_transform(verbalize_weight)
}

pub fn date_transform() -> TextTransform {
    stateless_transform(verbalize_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spells_small_and_compound_numbers() {
        assert_eq!(cardinal_to_words(0), "null");
        assert_eq!(cardinal_to_words(21), "einundzwanzig");
        assert_eq!(cardinal_to_words(1205), "eintausendzweihundertfünf");
    }

    #[test]
    fn verbalizes_currency() {
        assert_eq!(verbalize_currency("kostet 12€"), "kostet zwölf Euro");
    }

    #[test]
    fn verbalizes_percentage() {
        assert_eq!(verbalize_percentage("42% fertig"), "zweiundvierzig Prozent fertig");
    }

    #[test]
    fn verbalizes_date() {
        assert_eq!(verbalize_date("am 2024-01-15 trafen wir uns"), "am 15. Januar 2024 trafen wir uns");
    }
}
