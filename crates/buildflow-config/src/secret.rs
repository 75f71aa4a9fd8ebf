use std::fmt;

/// A value that must never show up in logs or trace output.
///
/// `Debug` and `Display` both print a mask; the only way to read the value
/// is [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

pub const MASK: &str = "******";

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", MASK)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}
