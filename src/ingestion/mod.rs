//! Source readers and the observer interface shared by every stage.
//!
//! - [`csv`]: header-driven tabular reader (customer sources)
//! - [`xml`]: root + repeated element reader (order sources)
//! - [`observability`]: [`PipelineObserver`] and its stock implementations

pub mod csv;
pub mod observability;
pub mod xml;

pub use observability::{
    CompositeObserver, JsonFileObserver, NullObserver, PipelineObserver, Severity, StageContext, StageKind,
    StageStats, TracingObserver,
};
pub use xml::RawNode;
