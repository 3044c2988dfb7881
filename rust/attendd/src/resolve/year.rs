#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearVariants {
    pub with_digits: String,
    pub with_roman: String,
}

/// Lower-cases, trims and collapses runs of whitespace to single spaces.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn roman_to_digit(token: &str) -> Option<&'static str> {
    match token {
        "i" => Some("1"),
        "ii" => Some("2"),
        "iii" => Some("3"),
        "iv" => Some("4"),
        _ => None,
    }
}

fn digit_to_roman(token: &str) -> Option<&'static str> {
    match token {
        "1" => Some("i"),
        "2" => Some("ii"),
        "3" => Some("iii"),
        "4" => Some("iv"),
        _ => None,
    }
}

fn swap_tokens(norm: &str, swap: fn(&str) -> Option<&'static str>) -> String {
    norm.split(' ')
        .map(|t| swap(t).unwrap_or(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Produces the label with year markers written as digits and as roman
/// numerals. Only whole whitespace-separated tokens are swapped, so "cse-i"
/// and "it-2" keep their suffix.
pub fn expand_year_variants(label: &str) -> YearVariants {
    let norm = normalize_label(label);
    YearVariants {
        with_digits: swap_tokens(&norm, roman_to_digit),
        with_roman: swap_tokens(&norm, digit_to_roman),
    }
}

/// First standalone year marker in the label, as 1..=4.
pub fn year_token(label: &str) -> Option<u8> {
    normalize_label(label).split(' ').find_map(|t| match t {
        "i" | "1" => Some(1),
        "ii" | "2" => Some(2),
        "iii" | "3" => Some(3),
        "iv" | "4" => Some(4),
        _ => None,
    })
}
