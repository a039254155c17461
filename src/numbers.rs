//! Number formatting used by the math functions: Roman numerals,
//! spreadsheet-style letters and English words.

use crate::error::MathError;

const ROMAN: &[(u64, &str)] = &[
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

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: &[(u64, &str)] = &[
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

const WORDS_LIMIT: f64 = 1e18;

/// Upper-case Roman numeral for an integer in `1..=3999`.
pub fn to_roman(x: f64) -> Result<String, MathError> {
    if x.fract() != 0.0 || !(1.0..4000.0).contains(&x) {
        return Err(MathError::OutOfRange {
            function: "toRomans",
            value: x,
        });
    }
    let mut n = x as u64;
    let mut out = String::new();
    for &(value, numeral) in ROMAN {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    Ok(out)
}

/// Column-style letters: 1 is `A`, 26 is `Z`, 27 is `AA`.
pub fn to_alpha(x: f64) -> Result<String, MathError> {
    if x.fract() != 0.0 || x < 1.0 || x > u64::MAX as f64 {
        return Err(MathError::OutOfRange {
            function: "toChar",
            value: x,
        });
    }
    let mut n = x as u64;
    let mut buf = Vec::new();
    while n > 0 {
        n -= 1;
        buf.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    buf.reverse();
    Ok(buf.into_iter().map(char::from).collect())
}

/// English words for `x` after rounding, e.g. `eighty thousand and eighty-five`.
pub fn to_words(x: f64) -> Result<String, MathError> {
    let rounded = (x + 0.5).floor();
    if !(0.0..WORDS_LIMIT).contains(&rounded) {
        return Err(MathError::OutOfRange {
            function: "toWords",
            value: x,
        });
    }
    Ok(spell(rounded as u64))
}

fn spell(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    if n < 100 {
        let (tens, ones) = (n / 10, n % 10);
        return match ones {
            0 => TENS[tens as usize].to_string(),
            _ => format!("{}-{}", TENS[tens as usize], ONES[ones as usize]),
        };
    }

    let mut parts = Vec::new();
    for &(scale, word) in SCALES {
        let group = (n / scale) % 1000;
        if group > 0 {
            parts.push(format!("{} {}", spell(group), word));
        }
    }
    let hundreds = (n / 100) % 10;
    if hundreds > 0 {
        parts.push(format!("{} hundred", ONES[hundreds as usize]));
    }
    let rest = n % 100;
    if rest > 0 {
        parts.push(format!("and {}", spell(rest)));
    }
    parts.join(" ")
}

/// Upper-case every letter that starts a word, hyphenated parts included.
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_boundary = true;
    for c in text.chars() {
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && at_boundary {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_boundary = !is_word;
    }
    out
}
