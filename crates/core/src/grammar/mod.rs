/// Template expander: substitutes argument values for `$name` placeholders.
pub mod expand;
/// Invocation reconstructor: maps expanded text onto a [`CallDescriptor`](invocation::CallDescriptor).
pub mod invocation;
/// Quote-aware tokenizer.
pub mod lexer;
/// `$identifier` placeholder scanning.
pub mod placeholder;
