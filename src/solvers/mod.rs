#[cfg(feature = "gurobi")]
pub mod gurobi;
