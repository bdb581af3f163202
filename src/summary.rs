//! Human readable rendering of calculation results

use std::fmt;

use crate::calculation::{OutputCode, SmeltingResult, UsedMineral};
use crate::models::SmeltingComponent;

/// How much of the output one component ended up making
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentShare {
    pub mineral: String,
    pub produced_mb: u64,
    pub percent: f64,
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmeltingSummary {
    pub output: String,
    pub requested_mb: i64,
    pub status: OutputCode,
    pub status_context: Option<String>,
    pub amount_mb: Option<u64>,
    pub shares: Vec<ComponentShare>,
    pub pieces: Vec<UsedMineral>,
}

/// Generate a summary of a calculation for `output`
pub fn summarize(
    output: &str,
    requested_mb: i64,
    components: &[SmeltingComponent],
    result: &SmeltingResult,
) -> SmeltingSummary {
    let shares = match result.plan() {
        Some(plan) => components
            .iter()
            .map(|component| {
                let produced_mb = plan.produced_mb(&component.mineral);
                let percent = if plan.amount_mb == 0 {
                    0.0
                } else {
                    produced_mb as f64 * 100.0 / plan.amount_mb as f64
                };
                ComponentShare {
                    mineral: component.mineral.clone(),
                    produced_mb,
                    percent,
                    min: component.min,
                    max: component.max,
                }
            })
            .collect(),
        None => Vec::new(),
    };

    SmeltingSummary {
        output: output.to_string(),
        requested_mb,
        status: result.status(),
        status_context: result.status_context().map(str::to_string),
        amount_mb: result.amount_mb(),
        shares,
        pieces: result.used_minerals().to_vec(),
    }
}

impl fmt::Display for SmeltingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Smelting Summary ===")?;
        writeln!(f, "Target: {} @ {} mB", self.output, self.requested_mb)?;
        match &self.status_context {
            Some(context) => writeln!(f, "Status: {} ({})", self.status, context)?,
            None => writeln!(f, "Status: {}", self.status)?,
        }

        let Some(amount_mb) = self.amount_mb else {
            return Ok(());
        };
        writeln!(f, "Amount: {amount_mb} mB")?;
        writeln!(f)?;

        writeln!(f, "Components:")?;
        for share in &self.shares {
            writeln!(
                f,
                "  {:<16} {:>6} mB {:>6.2}% (allowed {}-{}%)",
                share.mineral, share.produced_mb, share.percent, share.min, share.max
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Minerals used:")?;
        for piece in &self.pieces {
            let name = if piece.name.is_empty() { &piece.produces } else { &piece.name };
            writeln!(
                f,
                "  {}x {} ({}, {} mB) = {} mB",
                piece.quantity,
                name,
                piece.produces,
                piece.yield_mb,
                piece.total_mb()
            )?;
        }

        Ok(())
    }
}
