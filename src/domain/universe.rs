//! Symbol list parsing.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty symbol in list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("no symbols given")]
    NoSymbols,

    #[error("invalid symbol {0:?}: only letters, digits and . ^ = - are allowed")]
    InvalidSymbol(String),
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')
}

/// Symbols end up in file names and URL paths, so they are limited to
/// ticker characters and must contain at least one letter or digit.
pub fn check_symbol(symbol: &str) -> Result<(), UniverseError> {
    if symbol.chars().all(is_symbol_char) && symbol.chars().any(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(UniverseError::InvalidSymbol(symbol.to_string()))
    }
}

/// Parses a comma separated symbol list; whitespace inside an entry also
/// separates symbols. Symbols are upper-cased, restricted to ticker
/// characters and must be unique.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim_matches(|c: char| c == ',' || c.is_whitespace()).is_empty() {
        return Err(UniverseError::NoSymbols);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        for part in trimmed.split_whitespace() {
            let symbol = part.to_uppercase();
            check_symbol(&symbol)?;
            if !seen.insert(symbol.clone()) {
                return Err(UniverseError::DuplicateSymbol(symbol));
            }
            symbols.push(symbol);
        }
    }

    Ok(symbols)
}

/// Joins several CLI arguments, each of which may itself be a list.
pub fn parse_symbol_args(args: &[String]) -> Result<Vec<String>, UniverseError> {
    parse_symbols(&args.join(","))
}
