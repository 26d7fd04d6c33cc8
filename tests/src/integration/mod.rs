//! Cross-crate integration flows.

#[cfg(test)]
mod fixtures;

mod e2e_flows;
mod lifecycle;
mod persistence;
