//! Batch-size choices derived from the rollout size.
//!
//! A valid batch size divides `n_steps * num_envs` evenly. The control lists
//! every divisor in ascending order and preselects the second-largest one.

use crate::form::{Control, FieldName, Form, SelectOption};

pub const BATCH_SIZE_ID: &str = "batch-size-select";
pub const NO_VALID_BATCH_SIZES: &str = "No valid batch sizes available";

pub fn n_steps_field() -> FieldName {
    FieldName::hyper("n_steps")
}

pub fn num_envs_field() -> FieldName {
    FieldName::training("num_envs")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSizeChoice {
    Sizes { sizes: Vec<u64>, default: u64 },
    Unavailable,
}

/// Largest rollout whose batch sizes are listed. Enumeration is
/// O(sqrt(total)) and runs on every edit.
pub const MAX_ROLLOUT: u64 = 1 << 32;

/// All divisors of `total`, ascending. Empty for zero.
pub fn divisors(total: u64) -> Vec<u64> {
    let mut low = Vec::new();
    let mut high = Vec::new();
    let mut d = 1u64;
    while d.saturating_mul(d) <= total {
        if total % d == 0 {
            low.push(d);
            let pair = total / d;
            if pair != d {
                high.push(pair);
            }
        }
        d += 1;
    }
    high.reverse();
    low.extend(high);
    low
}

/// Choice for a rollout of `n_steps * num_envs` samples.
pub fn choice_for(n_steps: i64, num_envs: i64) -> BatchSizeChoice {
    let total = match n_steps.checked_mul(num_envs) {
        Some(total) if total > 0 => total as u64,
        _ => return BatchSizeChoice::Unavailable,
    };
    if total > MAX_ROLLOUT {
        tracing::warn!(total, "rollout too large to list batch sizes");
        return BatchSizeChoice::Unavailable;
    }
    let sizes = divisors(total);
    let default = if sizes.len() >= 2 {
        sizes[sizes.len() - 2]
    } else {
        sizes[0]
    };
    BatchSizeChoice::Sizes { sizes, default }
}

/// Parses an integer input the way the page does: leading integer part,
/// anything unparseable is invalid.
pub fn parse_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..digits_end].parse().ok()
}

/// Choice for the current form inputs.
pub fn choice_for_form(form: &Form) -> BatchSizeChoice {
    let n_steps = form.value(&n_steps_field()).and_then(parse_count);
    let num_envs = form.value(&num_envs_field()).and_then(parse_count);
    match (n_steps, num_envs) {
        (Some(n_steps), Some(num_envs)) => choice_for(n_steps, num_envs),
        _ => BatchSizeChoice::Unavailable,
    }
}

/// Recomputes the batch-size select. Returns the applied choice, or `None`
/// when the form has no batch-size control.
pub fn refresh(form: &mut Form) -> Option<BatchSizeChoice> {
    let choice = choice_for_form(form);
    let field = form.field_by_id_mut(BATCH_SIZE_ID)?;
    let Control::Select { options, value } = &mut field.control else {
        tracing::warn!("batch-size control is not a select");
        return None;
    };

    match &choice {
        BatchSizeChoice::Sizes { sizes, default } => {
            *options = sizes
                .iter()
                .map(|s| SelectOption::new(s.to_string()))
                .collect();
            *value = default.to_string();
            tracing::debug!(count = sizes.len(), default, "batch sizes refreshed");
        }
        BatchSizeChoice::Unavailable => {
            tracing::warn!("no valid batch sizes for the current n_steps and num_envs");
            *options = vec![SelectOption::placeholder(NO_VALID_BATCH_SIZES)];
            value.clear();
        }
    }
    Some(choice)
}
