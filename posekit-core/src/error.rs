/// Load-time error taxonomy
use thiserror::Error;

/// Errors raised while constructing a scene from host-supplied data.
///
/// Everything here is fatal at load: no partial or degraded armature is
/// ever kept. Per-frame numeric degeneracies are deliberately absent from
/// this enum; they are absorbed locally and never abort a frame.
#[derive(Error, Debug)]
pub enum PosekitError {
    /// The armature has no bones; a root at index 0 is required
    #[error("armature is empty: a root bone at index 0 is required")]
    EmptyArmature,

    /// A bone lists a child index outside the armature
    #[error("bone '{bone}' references child index {child} outside armature of {len} bones")]
    ChildIndexOutOfRange {
        bone: String,
        child: usize,
        len: usize,
    },

    /// A bone lists a child at or before its own index, which would make
    /// the parent-first evaluation order (and tree shape) impossible
    #[error("bone '{bone}' references child index {child} at or before itself (index {index})")]
    ChildIndexNotForward {
        bone: String,
        child: usize,
        index: usize,
    },

    /// The same bone is claimed as a child by more than one parent
    #[error("bone index {child} has more than one parent")]
    MultipleParents { child: usize },

    /// Two bones share a name; names must be unique within an armature
    #[error("duplicate bone name '{0}'")]
    DuplicateBoneName(String),

    /// A bind matrix could not be inverted to derive the inverse bind
    #[error("bind matrix of bone '{0}' is not invertible")]
    NonInvertibleBindMatrix(String),

    /// Configuration referenced a bone name that does not exist
    #[error("unknown bone '{0}'")]
    UnknownBone(String),
}

/// Result type using PosekitError
pub type Result<T> = std::result::Result<T, PosekitError>;
