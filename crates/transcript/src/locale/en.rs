//! English verbalizers.

use regex::Regex;
use std::sync::LazyLock;

use crate::transform::{stateless_transform, TextTransform};

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
];
const TENS: [&str; 10] = ["", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety"];
const SCALES: [&str; 4] = ["", "thousand", "million", "billion"];

fn below_hundred(n: u64) -> String {
    if n < 20 {
        ONES[n as usize].to_string()
    } else {
        let tens = TENS[(n / 10) as usize];
        if n % 10 == 0 {
            tens.to_string()
        } else {
            format!("{tens}-{}", ONES[(n % 10) as usize])
        }
    }
}

fn below_thousand(n: u64) -> String {
    if n < 100 {
        return below_hundred(n);
    }
    let hundreds = n / 100;
    let rest = n % 100;
    if rest == 0 {
        format!("{} hundred", ONES[hundreds as usize])
    } else {
        format!("{} hundred {}", ONES[hundreds as usize], below_hundred(rest))
    }
}

/// Spells out an integer, e.g. `1205` -> `one thousand two hundred five`.
pub fn cardinal_to_words(n: i64) -> String {
    if n == 0 {
        return "zero".to_string();
    }
    let negative = n < 0;
    let mut n = n.unsigned_abs();
    let mut groups = Vec::new();
    let mut scale_idx = 0;
    while n > 0 {
        let group = n % 1000;
        if group != 0 {
            let word = below_thousand(group);
            groups.push(if SCALES[scale_idx].is_empty() {
                word
            } else {
                format!("{word} {}", SCALES[scale_idx])
            });
        }
        n /= 1000;
        scale_idx += 1;
    }
    groups.reverse();
    let words = groups.join(" ");
    if negative {
        format!("negative {words}")
    } else {
        words
    }
}

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\b\d+\b").unwrap());
static CURRENCY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d+)(?:\.(\d{2}))?").unwrap());
static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)%").unwrap());
static DISTANCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\s?(km|mi|m)\b").unwrap());
static WEIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\s?(kg|lb|g)\b").unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October", "November", "December",
];

/// Every bare integer to its cardinal spelling. Applied after the more
/// specific verbalizers below so it doesn't consume digits they still need.
pub fn verbalize_numbers(text: &str) -> String {
    INTEGER
        .replace_all(text, |caps: &regex::Captures| cardinal_to_words(caps[0].parse().unwrap_or(0)))
        .into_owned()
}

/// `$12.50` -> `twelve dollars and fifty cents`; `$3` -> `three dollars`.
pub fn verbalize_currency(text: &str) -> String {
    CURRENCY
        .replace_all(text, |caps: &regex::Captures| {
            let dollars: i64 = caps[1].parse().unwrap_or(0);
            let dollars_word = format!("{} dollar{}", cardinal_to_words(dollars), if dollars == 1 { "" } else { "s" });
            match caps.get(2) {
                Some(cents) => {
                    let cents: i64 = cents.as_str().parse().unwrap_or(0);
                    format!("{dollars_word} and {} cent{}", cardinal_to_words(cents), if cents == 1 { "" } else { "s" })
                }
                None => dollars_word,
            }
        })
        .into_owned()
}

/// `42%` -> `forty-two percent`.
pub fn verbalize_percentage(text: &str) -> String {
    PERCENTAGE
        .replace_all(text, |caps: &regex::Captures| format!("{} percent", cardinal_to_words(caps[1].parse().unwrap_or(0))))
        .into_owned()
}

/// `5km` -> `five kilometers`; `3mi` -> `three miles`; `2m` -> `two meters`.
pub fn verbalize_distance(text: &str) -> String {
    DISTANCE
        .replace_all(text, |caps: &regex::Captures| {
            let n: i64 = caps[1].parse().unwrap_or(0);
            let unit = match &caps[2] {
                "km" => "kilometer",
                "mi" => "mile",
                _ => "meter",
            };
            format!("{} {unit}{}", cardinal_to_words(n), if n == 1 { "" } else { "s" })
        })
        .into_owned()
}

/// `5kg` -> `five kilograms`; `10lb` -> `ten pounds`; `3g` -> `three grams`.
pub fn verbalize_weight(text: &str) -> String {
    WEIGHT
        .replace_all(text, |caps: &regex::Captures| {
            let n: i64 = caps[1].parse().unwrap_or(0);
            let unit = match &caps[2] {
                "kg" => "kilogram",
                "lb" => "pound",
                _ => "gram",
            };
            format!("{} {unit}{}", cardinal_to_words(n), if n == 1 { "" } else { "s" })
        })
        .into_owned()
}

/// `2024-01-15` -> `January 15, 2024`.
pub fn verbalize_date(text: &str) -> String {
    ISO_DATE
        .replace_all(text, |caps: &regex::Captures| {
            let year = &caps[1];
            let month: usize = caps[2].parse().unwrap_or(1);
            let day = &caps[3];
            let month_name = MONTHS.get(month.saturating_sub(1)).copied().unwrap_or("January");
            format!("{month_name} {}, {year}", day.trim_start_matches('0'))
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
    fn spells_small_numbers() {
        assert_eq!(cardinal_to_words(0), "zero");
        assert_eq!(cardinal_to_words(7), "seven");
        assert_eq!(cardinal_to_words(21), "twenty-one");
    }

    #[test]
    fn spells_hundreds_and_thousands() {
        assert_eq!(cardinal_to_words(205), "two hundred five");
        assert_eq!(cardinal_to_words(1205), "one thousand two hundred five");
    }

    #[test]
    fn spells_negative() {
        assert_eq!(cardinal_to_words(-5), "negative five");
    }

    #[test]
    fn verbalizes_currency_with_cents() {
        assert_eq!(verbalize_currency("it costs $12.50"), "it costs twelve dollars and fifty cents");
    }

    #[test]
    fn verbalizes_percentage() {
        assert_eq!(verbalize_percentage("42% done"), "forty-two percent done");
    }

    #[test]
    fn verbalizes_distance_and_weight() {
        assert_eq!(verbalize_distance("run 5km"), "run five kilometers");
        assert_eq!(verbalize_weight("lift 10kg"), "lift ten kilograms");
    }

    #[test]
    fn verbalizes_iso_date() {
        assert_eq!(verbalize_date("on 2024-01-15 we met"), "on January 15, 2024 we met");
    }
}
