//! Small text and number helpers: reference codes, slugs, sizes, ages.

use chrono::{Datelike, NaiveDate};
use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random code of uppercase letters and digits appended to `prefix`.
///
/// ```ignore
/// let receipt = generate_unique_code("RCPT-", 8); // "RCPT-7K2Q9ZAB"
/// ```
pub fn generate_unique_code(prefix: &str, length: usize) -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}{code}")
}

/// Lowercase ASCII slug with single dashes between words.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }

    slug
}

/// First slug in `base`, `base-1`, `base-2`, ... for which `taken` is false.
pub fn slugify_unique<F>(text: &str, mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = match slugify(text) {
        s if s.is_empty() => "tenant".to_string(),
        s => s,
    };

    if !taken(&base) {
        return base;
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}-{counter}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Human readable byte count with two decimals, e.g. `1.50 KB`.
pub fn format_file_size(bytes: f64) -> String {
    let mut size = bytes;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}

/// Whole years between `date_of_birth` and `today`.
pub fn calculate_age(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_prefix_and_alphabet() {
        let code = generate_unique_code("TKT-", 8);
        assert!(code.starts_with("TKT-"));
        let tail = &code[4..];
        assert_eq!(tail.len(), 8);
        assert!(tail.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("St. Xavier's  College"), "st-xaviers-college");
        assert_eq!(slugify("  Hello__World  "), "hello-world");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn slugify_unique_appends_counter() {
        let existing = ["riverdale", "riverdale-1"];
        let slug = slugify_unique("Riverdale", |s| existing.contains(&s));
        assert_eq!(slug, "riverdale-2");
        assert_eq!(slugify_unique("Fresh", |_| false), "fresh");
    }

    #[test]
    fn file_sizes_render_in_largest_unit() {
        assert_eq!(format_file_size(512.0), "512.00 B");
        assert_eq!(format_file_size(1536.0), "1.50 KB");
        assert_eq!(format_file_size(10.0 * 1024.0 * 1024.0 * 1024.0), "10.00 GB");
        assert_eq!(format_file_size(1024f64.powi(5) * 3.0), "3.00 PB");
    }

    #[test]
    fn age_accounts_for_birthday_not_reached() {
        let dob = NaiveDate::from_ymd_opt(2000, 9, 15).unwrap();
        let before = NaiveDate::from_ymd_opt(2024, 9, 14).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();
        assert_eq!(calculate_age(dob, before), 23);
        assert_eq!(calculate_age(dob, on), 24);
    }
}
