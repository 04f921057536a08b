//! Fan-out over valuation dates and symbols.
//!
//! [`range::aggregate`] walks a date span for one symbol; [`batch::run`] runs
//! that walk for many symbols on a bounded worker pool. Both layers turn unit
//! failures into missing rows and only fail when nothing survived.

pub mod batch;
pub mod range;

pub use batch::run as run_batch;
pub use range::aggregate as aggregate_range;
