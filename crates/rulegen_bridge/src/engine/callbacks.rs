use crate::attributes::AttributeValue;
use crate::engine::{GeneratedShape, Status};

/// Answer to [`GenerateCallbacks::progress`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    /// Stop scheduling new work and return what has been produced.
    CancelAndFinish,
}

/// Severity of rule and asset errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
}

/// Receives generation output from the engine.
///
/// `shape_index` is the position of the initial shape within the slice passed
/// to [`crate::engine::RuleEngine::generate`]. For each initial shape the
/// engine reports attributes before calling [`GenerateCallbacks::add`].
pub trait GenerateCallbacks {
    /// Generated output of the initial shape at `shape_index`.
    fn add(&mut self, shape_index: usize, shape: &GeneratedShape) -> Status;

    fn generate_error(&mut self, shape_index: usize, status: Status, message: &str) -> Status;

    fn asset_error(
        &mut self,
        shape_index: usize,
        level: ErrorLevel,
        key: &str,
        uri: &str,
        message: &str,
    ) -> Status;

    fn cga_error(&mut self, shape_index: usize, shape_id: i32, level: ErrorLevel, message: &str) -> Status;

    fn cga_print(&mut self, shape_index: usize, shape_id: i32, text: &str) -> Status;

    /// One attribute value of the generated shape `shape_id`.
    fn attribute(&mut self, shape_index: usize, shape_id: i32, key: &str, value: AttributeValue) -> Status;

    fn progress(&mut self, _percent: f32) -> Continuation {
        Continuation::Continue
    }
}
