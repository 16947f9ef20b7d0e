//! Random test data for payment requests

use rand::seq::SliceRandom;
use rand::Rng;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Random end-user name: 4 to 20 ASCII letters, capitalized
pub fn random_name() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(4..=20);
    let mut name: String = (0..len)
        .map(|_| *LETTERS.choose(&mut rng).unwrap_or(&b'A') as char)
        .collect();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    name
}

/// Random eight digit phone number starting with 99
pub fn random_phone() -> String {
    rand::thread_rng().gen_range(99_000_000..=99_999_999u32).to_string()
}

/// Random amount between 10 and 1000 with cent precision
pub fn random_amount() -> String {
    format_cents(rand::thread_rng().gen_range(10_00..=1000_00))
}

/// Render cents as a decimal without trailing fractional zeros
pub fn format_cents(cents: u64) -> String {
    let whole = cents / 100;
    let fraction = cents % 100;
    if fraction == 0 {
        whole.to_string()
    } else if fraction % 10 == 0 {
        format!("{}.{}", whole, fraction / 10)
    } else {
        format!("{}.{:02}", whole, fraction)
    }
}
