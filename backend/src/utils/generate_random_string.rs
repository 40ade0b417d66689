//! Random secret generation.

use rand::{Rng, seq::SliceRandom};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
/// Symbols that survive shells, `.env` files and HTML without quoting.
const SAFE_SYMBOLS: &[u8] = b"!@#$%^&*()_-=+";

/// Generates a password from the thread-local CSPRNG containing at least
/// one lowercase letter, one uppercase letter, one digit and one symbol.
///
/// # Panics
///
/// Panics if `length` is smaller than 4.
pub fn generate_secure_password(length: usize) -> String {
    assert!(length >= 4, "password length must be at least 4");

    let mut rng = rand::thread_rng();
    let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SAFE_SYMBOLS].concat();

    let mut password: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SAFE_SYMBOLS]
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    password.extend((4..length).map(|_| alphabet[rng.gen_range(0..alphabet.len())]));
    password.shuffle(&mut rng);

    password.into_iter().map(char::from).collect()
}
