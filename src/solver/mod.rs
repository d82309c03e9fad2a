//! Rule evaluation: the fixpoint engines and the augmentation function built on them.

pub mod augment;
pub mod engine;

pub use augment::Augmenter;
pub use engine::{apply_rules, EvaluationStrategy, FixpointEngine, FixpointStats};
