//! Board categories (the three fixed columns).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the three fixed board columns.
///
/// The set is closed: clients cannot create new categories, and any other
/// identifier is rejected when parsing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    WentWell,
    ToImprove,
    ActionItems,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [Category::WentWell, Category::ToImprove, Category::ActionItems];

    /// Wire identifier (`"went_well"`, `"to_improve"`, `"action_items"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Category::WentWell => "went_well",
            Category::ToImprove => "to_improve",
            Category::ActionItems => "action_items",
        }
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "went_well" => Ok(Category::WentWell),
            "to_improve" => Ok(Category::ToImprove),
            "action_items" => Ok(Category::ActionItems),
            other => Err(CoreError::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn rejects_unknown_and_differently_cased_names() {
        assert!(matches!(
            "kudos".parse::<Category>(),
            Err(CoreError::UnknownCategory(name)) if name == "kudos"
        ));
        assert!("Went_Well".parse::<Category>().is_err());
    }
}
