//! Title validation for callers.
//!
//! The engine accepts any title it is given; these checks belong to whoever
//! collects the text from the user.

use thiserror::Error;

/// Maximum title length, counted in characters.
pub const MAX_TITLE_CHARS: usize = 500;

/// A title rejected by [`validate_title`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TitleError {
    /// The title is empty or only whitespace.
    #[error("title must not be blank")]
    Blank,

    /// The title exceeds [`MAX_TITLE_CHARS`].
    #[error("title is {len} characters, limit is {max}")]
    TooLong {
        /// Length of the rejected title in characters.
        len: usize,
        /// The limit.
        max: usize,
    },
}

/// Checks that a title is non-blank and within the length limit.
pub fn validate_title(title: &str) -> Result<(), TitleError> {
    if title.trim().is_empty() {
        return Err(TitleError::Blank);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(TitleError::TooLong {
            len,
            max: MAX_TITLE_CHARS,
        });
    }
    Ok(())
}
