//! Outbound display command serialization
//!
//! Commands are plain text (`field.prop=value`, string values quoted)
//! followed by the 3-byte terminator. Each command is sent immediately;
//! there is no batching.

use super::link::{TERMINATOR, TERMINATOR_RUN};

/// One command to the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    /// `field.txt="value"`
    SetText { field: String, value: String },
    /// `field.val=value` (also covers `.tim` via `SetAttr`)
    SetValue { field: String, value: u32 },
    /// Arbitrary attribute assignment, e.g. `tap_timer.tim=500`
    SetAttr {
        field: String,
        attr: &'static str,
        value: u32,
    },
    /// `page N` - switch the visible page
    Page(u8),
    /// `baud=N` - tell the display to change its link speed
    Baud(u32),
}

impl ScreenCommand {
    pub fn set_text(field: impl Into<String>, value: impl Into<String>) -> Self {
        ScreenCommand::SetText {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn set_value(field: impl Into<String>, value: u32) -> Self {
        ScreenCommand::SetValue {
            field: field.into(),
            value,
        }
    }

    /// Serialize to wire bytes, terminator included.
    pub fn encode(&self) -> Vec<u8> {
        let text = match self {
            ScreenCommand::SetText { field, value } => format!("{field}.txt=\"{value}\""),
            ScreenCommand::SetValue { field, value } => format!("{field}.val={value}"),
            ScreenCommand::SetAttr { field, attr, value } => format!("{field}.{attr}={value}"),
            ScreenCommand::Page(page) => format!("page {page}"),
            ScreenCommand::Baud(baud) => format!("baud={baud}"),
        };
        let mut bytes = text.into_bytes();
        bytes.extend(std::iter::repeat(TERMINATOR).take(TERMINATOR_RUN));
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_text_quotes_value() {
        let bytes = ScreenCommand::set_text("loop0", "Drive").encode();
        assert_eq!(&bytes[..bytes.len() - 3], b"loop0.txt=\"Drive\"");
        assert_eq!(&bytes[bytes.len() - 3..], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_set_value() {
        let bytes = ScreenCommand::set_value("blink", 5).encode();
        assert_eq!(&bytes[..bytes.len() - 3], b"blink.val=5");
    }

    #[test]
    fn test_set_attr() {
        let command = ScreenCommand::SetAttr {
            field: "tap_timer".into(),
            attr: "tim",
            value: 625,
        };
        assert_eq!(&command.encode()[..17], b"tap_timer.tim=625");
    }

    #[test]
    fn test_page_and_baud() {
        assert_eq!(&ScreenCommand::Page(2).encode()[..6], b"page 2");
        assert_eq!(&ScreenCommand::Baud(921_600).encode()[..11], b"baud=921600");
    }
}
