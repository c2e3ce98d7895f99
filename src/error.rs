use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can
/// potentially return.
///
/// Structure recovery distinguishes between *recoverable* failures (malformed or
/// empty inputs, a broken control-flow graph handed to the interval analyzer) and
/// *invariant violations* (a scope id used after deletion, a VMA range whose end
/// precedes its begin). The former are reported through this enum; the latter are
/// programming or input-model errors and abort via assertion, since no meaningful
/// local recovery exists for them.
///
/// # Examples
///
/// ```rust,ignore
/// use binscope::{Error, structure::StructureBuilder};
///
/// match builder.build_procedure(&mut tree, lm, &proc, &instrs) {
///     Ok(loops) => println!("recovered {loops} loops"),
///     Err(Error::IntervalAnalysis(msg)) => eprintln!("interval analysis failed: {msg}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Provided input was empty.
    ///
    /// Returned when a procedure with no instructions, or a CFG with no basic
    /// blocks, is handed to a component that requires at least one element.
    #[error("Provided input was empty")]
    Empty,

    /// A graph operation referenced a node or edge that does not exist.
    ///
    /// This covers out-of-range successor indices during CFG construction and
    /// malformed adjacency supplied by a caller.
    #[error("{0}")]
    GraphError(String),

    /// The interval (nested strongly-connected-region) analysis failed.
    ///
    /// The analysis itself has no partial-result mode; a failure here means the
    /// recovered CFG was unusable (e.g. the entry block was unreachable from
    /// itself after restriction). The message carries the analyzer's own
    /// diagnostic, re-raised at the structure-recovery call boundary.
    #[error("Interval analysis failed: {0}")]
    IntervalAnalysis(String),
}
