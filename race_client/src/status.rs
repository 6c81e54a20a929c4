//! Short coloured messages shown by the scenes.

use race_shared::palette::{self, Rgb};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Danger,
}

impl Tone {
    pub fn color(self) -> Rgb {
        match self {
            Tone::Info => palette::TEXT_SECONDARY,
            Tone::Success => palette::TEXT_SUCCESS,
            Tone::Danger => palette::TEXT_DANGER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Success,
        }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Danger,
        }
    }

    /// Danger line for a failed operation. Precondition failures are shown
    /// as their bare prompt; everything else is prefixed with `prefix`.
    pub fn failure(prefix: &str, err: &ClientError) -> Self {
        if err.is_precondition() {
            Self::danger(err.to_string())
        } else {
            Self::danger(format!("{prefix}: {err}"))
        }
    }

    pub fn is_danger(&self) -> bool {
        self.tone == Tone::Danger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Missing;

    #[test]
    fn failure_lines() {
        let line = StatusLine::failure("Error", &ClientError::Rejected("Room is full".into()));
        assert_eq!(line.text, "Error: Room is full");
        assert!(line.is_danger());

        let line = StatusLine::failure("Error", &ClientError::Precondition(Missing::Token));
        assert_eq!(line.text, "Please enter JWT token first");
        assert_eq!(line.tone.color(), palette::TEXT_DANGER);
    }
}
