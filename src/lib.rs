pub mod config;
pub mod diagnostic;
pub mod inline;
pub mod kernel;
pub mod lower;
pub mod select;
pub mod stride;

// Re-exports: the names a code generator reaches for
pub use config::target;
pub use diagnostic::{catch_internal_error, Diagnostic};
pub use kernel::{registry, KernelDescriptor, KernelRegistry};
pub use select::{select, ComparisonRequest, Length, Selection, Selector};
pub use stride::{DirectSlot, Stride};
