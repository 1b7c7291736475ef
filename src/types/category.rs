use std::{cmp::Ordering, fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

/// Surface category of a planimetric feature class.
///
/// Each variant carries an explicit rank (0 = highest priority). The rank
/// defines the default resolution order and the `Ord` implementation, so the
/// precedence never depends on declaration or loading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Median,         // Maintenance areas, always win
    Building,
    Road,
    ParkingLot,
    Driveway,
    Sidewalk,
    ImperviousMisc, // Anything left over
}

impl Category {
    /// All categories, highest priority first.
    pub const ALL: [Category; 7] = [
        Category::Median,
        Category::Building,
        Category::Road,
        Category::ParkingLot,
        Category::Driveway,
        Category::Sidewalk,
        Category::ImperviousMisc,
    ];

    /// Fixed rank of the category, 0 is the highest priority.
    pub fn rank(&self) -> u8 {
        match self {
            Category::Median => 0,
            Category::Building => 1,
            Category::Road => 2,
            Category::ParkingLot => 3,
            Category::Driveway => 4,
            Category::Sidewalk => 5,
            Category::ImperviousMisc => 6,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Category::Median => "median",
            Category::Building => "building",
            Category::Road => "road",
            Category::ParkingLot => "parking_lot",
            Category::Driveway => "driveway",
            Category::Sidewalk => "sidewalk",
            Category::ImperviousMisc => "impervious_misc",
        }
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering { self.rank().cmp(&other.rank()) }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.to_str()) }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL.into_iter()
            .find(|category| category.to_str() == s)
            .ok_or_else(|| anyhow!("[types::category] Unknown surface category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::Category;

    #[test]
    fn ranks_are_total_and_match_all() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.rank() as usize, i);
        }
        assert!(Category::Median < Category::Building);
        assert!(Category::Sidewalk < Category::ImperviousMisc);
    }

    #[test]
    fn names_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.to_str().parse::<Category>().unwrap(), category);
        }
        assert!("lawn".parse::<Category>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Category::ParkingLot).unwrap();
        assert_eq!(json, "\"parking_lot\"");
        let back: Category = serde_json::from_str("\"impervious_misc\"").unwrap();
        assert_eq!(back, Category::ImperviousMisc);
    }
}
