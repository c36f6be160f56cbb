// Domain layer modules
pub mod condition_evaluator;
pub mod date_range;
pub mod key_condition;
pub mod query_spec;

// Re-exports
pub use condition_evaluator::ConditionEvaluator;
pub use date_range::DateRange;
pub use key_condition::{
    KeyCondition, KeyConditionError, KeyTerm, NameBinding, SortCondition, ValueBinding,
};
pub use query_spec::{DATA_ATTRIBUTE, QueryBuildError, QuerySpec};
