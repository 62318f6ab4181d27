//! Candidate-SQL handling
//!
//! The model's output is an untrusted string. `CandidateSql` carries it from
//! extraction through validation; `ValidatedSql` can only be minted by
//! [`validate`], so unvalidated text cannot reach the query engine by
//! construction.

mod extract;
mod validate;

pub use extract::CandidateSql;
pub use validate::{validate, ValidatedSql, ValidationError};
