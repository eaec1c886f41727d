//! Core business logic for Claimflow.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and the approval state machine live here.
//!
//! # Modules
//!
//! - `approval` - Approval rules, approver chains and the decision engine
//! - `expense` - Expense drafts and submission validation
//! - `currency` - Conversion into the company currency

pub mod approval;
pub mod currency;
pub mod expense;
