use roomtrace_common::GridCoord;

use crate::map::MapError;

/// Errors from world construction and room queries.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("malformed map: {0}")]
    MalformedMap(#[from] MapError),
    #[error("coordinate {0} is not in any room")]
    CoordinateNotInAnyRoom(GridCoord),
    #[error("mesh '{label}' was already uploaded")]
    MeshAlreadyUploaded { label: String },
}
