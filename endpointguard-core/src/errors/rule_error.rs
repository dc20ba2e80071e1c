//! Rule evaluation errors.
//!
//! Per spec, rules never throw on bad inputs — they degrade to "no finding"
//! and omit the offending file. This enum exists for the cases the design
//! calls bugs (§7): a rule implementation panicking is caught by the caller
//! and reported here rather than propagated as a panic.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule {rule_id} failed on {file}: {message}")]
    Failed {
        rule_id: String,
        file: String,
        message: String,
    },
}
