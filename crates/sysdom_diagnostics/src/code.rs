//! Issue codes: a category letter plus a three-digit number, e.g. `S001`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The area an issue belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Operation attempted in the wrong kernel phase (`P`).
    Phase,
    /// Component tree and port binding (`S`).
    Structure,
    /// Signal driver conflicts (`D`).
    Driver,
    /// Modelled hardware races such as memory port collisions (`C`).
    Collision,
    /// Process or component configuration (`K`).
    Config,
    /// Messages reported by user processes (`U`).
    User,
}

impl Category {
    /// The prefix letter.
    pub fn prefix(self) -> char {
        match self {
            Category::Phase => 'P',
            Category::Structure => 'S',
            Category::Driver => 'D',
            Category::Collision => 'C',
            Category::Config => 'K',
            Category::User => 'U',
        }
    }
}

/// A structured issue code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct IssueCode {
    /// The area.
    pub category: Category,
    /// Number within the area.
    pub number: u16,
}

impl IssueCode {
    /// Creates a code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// A component or signal was given a second owner.
    pub const MULTIPLE_DECLARATION: IssueCode = IssueCode::new(Category::Structure, 1);
    /// A port was never bound to a signal.
    pub const UNBOUND_PORT: IssueCode = IssueCode::new(Category::Structure, 2);
    /// A port was bound to a signal of a different width.
    pub const PORT_WIDTH_MISMATCH: IssueCode = IssueCode::new(Category::Structure, 3);
    /// A component was made its own owner or an ancestor's child.
    pub const OWNERSHIP_CYCLE: IssueCode = IssueCode::new(Category::Structure, 4);
    /// Two ordinary drivers wrote one signal in the same delta cycle.
    pub const MULTIPLE_DRIVERS: IssueCode = IssueCode::new(Category::Driver, 1);
    /// Two memory ports accessed the same cell in one cycle.
    pub const PORT_COLLISION: IssueCode = IssueCode::new(Category::Collision, 1);
    /// A memory address contained unknown bits.
    pub const IMPROPER_ADDRESS: IssueCode = IssueCode::new(Category::Collision, 2);
    /// A message from user code.
    pub const USER: IssueCode = IssueCode::new(Category::User, 0);
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(IssueCode::MULTIPLE_DECLARATION.to_string(), "S001");
        assert_eq!(IssueCode::MULTIPLE_DRIVERS.to_string(), "D001");
        assert_eq!(IssueCode::new(Category::Config, 42).to_string(), "K042");
        assert_eq!(IssueCode::USER.to_string(), "U000");
    }

    #[test]
    fn serde_roundtrip() {
        let code = IssueCode::PORT_COLLISION;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(serde_json::from_str::<IssueCode>(&json).unwrap(), code);
    }
}
