use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a rider identity (a mobile number) so log output only shows its tail.
///
/// Serialization is untouched: responses must carry the real value.
#[derive(Clone, Deserialize)]
pub struct Masked<T>(pub T);

const VISIBLE_TAIL: usize = 4;

fn mask(raw: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let count = raw.chars().count();
    if count <= VISIBLE_TAIL {
        return write!(f, "{}", "*".repeat(count.max(1)));
    }
    let tail: String = raw.chars().skip(count - VISIBLE_TAIL).collect();
    write!(f, "{}{}", "*".repeat(count - VISIBLE_TAIL), tail)
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        mask(self.0.as_ref(), f)
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        mask(self.0.as_ref(), f)
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}
