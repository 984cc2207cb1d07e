pub mod archive;
pub mod classifier;
pub mod ledger;
pub mod pipeline;
pub mod placer;
pub mod scanner;

pub use classifier::{ClassificationRule, Classifier, RuleMatcher};
pub use ledger::{AssignmentRecord, Ledger, Outcome};
pub use pipeline::{Pipeline, RunSummary};
