//! Greedy policy search for grounded STRIPS problems, guided by an external value model over
//! states saturated with stratified Datalog rules.

mod error;
pub use error::{Error, Result};
pub mod lang;
pub mod middleware;
pub mod planning;
pub mod policy;
pub mod rules;
pub mod serve;
pub mod solver;

#[cfg(test)]
mod test_utils;
