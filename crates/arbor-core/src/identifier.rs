//! Element identity for diagram models.
//!
//! Every node, group and edge receives an [`Id`] when it is constructed. Ids
//! are random UUIDs, so they are unique across diagrams built in the same
//! process and can never be confused between two models.
//!
//! Ids are an in-memory addressing scheme only. The DOT serializer assigns
//! its own traversal-ordered names, which keeps rendered output independent
//! of the random values stored here.

use std::fmt;

use uuid::Uuid;

/// Process-unique identifier of a diagram element.
///
/// # Examples
///
/// ```
/// use arbor_core::identifier::Id;
///
/// let a = Id::generate();
/// let b = Id::generate();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Uuid);

impl Id {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in log output and error messages.
    ///
    /// The first eight hex digits are enough to tell elements apart when
    /// reading a log.
    pub fn short(&self) -> String {
        let mut hex = self.0.simple().to_string();
        hex.truncate(8);
        hex
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
