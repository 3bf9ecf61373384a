//! Payroll Execution Engine
//!
//! This crate turns employee, attendance, leave and adjustment facts into
//! gated payroll runs with auditable per-employee salary breakdowns, and
//! emits immutable payslips from locked runs.

#![warn(missing_docs)]

pub mod api;
pub mod approval;
pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod models;
pub mod payslip;
pub mod state_machine;
