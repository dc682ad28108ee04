//! Farmer names

/// Names handed to generated farmers, in order
pub static FARMER_NAMES: &[&str] = &[
    "Robin", "Abigail", "Linus", "Marnie", "Clint", "Leah", "Willy", "Emily", "Gus", "Pierre",
];
