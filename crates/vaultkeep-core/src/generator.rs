//! Random password generation.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::GeneratorError;

pub const MIN_LENGTH: usize = 4;
pub const MAX_LENGTH: usize = 128;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
/// Characters easily confused with one another when read.
const SIMILAR: &str = "il1Lo0O";

/// What a generated password may contain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordOptions {
    pub length: usize,
    #[serde(alias = "includeUppercase")]
    pub uppercase: bool,
    #[serde(alias = "includeLowercase")]
    pub lowercase: bool,
    #[serde(alias = "includeNumbers")]
    pub numbers: bool,
    #[serde(alias = "includeSymbols")]
    pub symbols: bool,
    pub exclude_similar: bool,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            numbers: true,
            symbols: true,
            exclude_similar: true,
        }
    }
}

impl PasswordOptions {
    fn charset(&self) -> Vec<char> {
        [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.numbers, NUMBERS),
            (self.symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, chars)| chars.chars())
        .filter(|c| !(self.exclude_similar && SIMILAR.contains(*c)))
        .collect()
    }
}

/// Generate a password from the OS CSPRNG.
///
/// # Errors
///
/// [`GeneratorError::InvalidLength`] outside `MIN_LENGTH..=MAX_LENGTH`,
/// [`GeneratorError::EmptyCharset`] if every class is disabled.
pub fn generate_password(options: &PasswordOptions) -> Result<String, GeneratorError> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&options.length) {
        return Err(GeneratorError::InvalidLength {
            min: MIN_LENGTH,
            max: MAX_LENGTH,
            actual: options.length,
        });
    }

    let charset = options.charset();
    if charset.is_empty() {
        return Err(GeneratorError::EmptyCharset);
    }

    let mut rng = OsRng;
    Ok((0..options.length)
        .filter_map(|_| charset.choose(&mut rng))
        .collect())
}
