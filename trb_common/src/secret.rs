use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper that keeps credentials out of logs.
///
/// The Tribute API key doubles as the webhook signing secret, and the server's `Debug`-derived
/// configuration dumps would otherwise leak it (and the bot token) straight into the log stream.
/// Both `Debug` and `Display` render as `****`; the wrapped value is only reachable through
/// [`Secret::reveal`], which keeps every disclosure site greppable.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Hands out the wrapped value. Keep the result away from log and error messages.
    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// An empty credential is treated the same as an unset one: environment parsing stores the
    /// raw value, and callers gate on this before using it for signing or authentication.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
