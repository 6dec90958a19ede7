use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// No clip with this index or name.
    AnimationNotFound(String),
    NoAnimations,
}

impl Display for PlaybackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::AnimationNotFound(name) => write!(f, "Animation {} not found", name),
            PlaybackError::NoAnimations => write!(f, "Asset has no animations"),
        }
    }
}

impl Error for PlaybackError {}
