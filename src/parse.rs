//! Command line text forms for component windows and mineral pieces

use regex::Regex;
use thiserror::Error;

use crate::models::{QuantifiedMineral, SmeltingComponent};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid component '{0}', expected mineral:min-max (e.g. copper:88-92)")]
    InvalidComponent(String),

    #[error("Invalid piece '{0}', expected mineral:yieldxquantity[@name] (e.g. tin:16x3)")]
    InvalidPiece(String),

    #[error("Percentages of '{0}' must satisfy min <= max <= 100")]
    PercentOutOfRange(String),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Parse `mineral:min-max`
pub fn parse_component(text: &str) -> Result<SmeltingComponent, ParseError> {
    let re = Regex::new(r"^\s*([^:]+?)\s*:\s*(\d+)\s*-\s*(\d+)\s*$")?;
    let cap = re
        .captures(text)
        .ok_or_else(|| ParseError::InvalidComponent(text.to_string()))?;

    let min: u32 = cap[2]
        .parse()
        .map_err(|_| ParseError::PercentOutOfRange(text.to_string()))?;
    let max: u32 = cap[3]
        .parse()
        .map_err(|_| ParseError::PercentOutOfRange(text.to_string()))?;
    if min > max || max > 100 {
        return Err(ParseError::PercentOutOfRange(text.to_string()));
    }

    Ok(SmeltingComponent::new(&cap[1], min, max))
}

/// Parse `mineral:yieldxquantity` with an optional `@name` suffix
pub fn parse_piece(text: &str) -> Result<QuantifiedMineral, ParseError> {
    let re = Regex::new(r"^\s*([^:@]+?)\s*:\s*(\d+)\s*[xX]\s*(\d+)\s*(?:@\s*(.+?)\s*)?$")?;
    let cap = re
        .captures(text)
        .ok_or_else(|| ParseError::InvalidPiece(text.to_string()))?;

    let invalid = |_| ParseError::InvalidPiece(text.to_string());
    let yield_mb: u32 = cap[2].parse().map_err(invalid)?;
    let quantity: u32 = cap[3].parse().map_err(invalid)?;
    let name = cap.get(4).map_or("", |m| m.as_str());

    Ok(QuantifiedMineral::new(name, &cap[1], yield_mb, quantity))
}
