use crate::Technician;

/// Read-only inputs the reducer needs besides the state itself.
/// The imperative shell builds one per call.
#[derive(Clone, Debug)]
pub struct EngineContext {
    pub technician: Technician,
    pub now_unix: i64,
}
