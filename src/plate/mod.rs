//! Plate text handling.
//!
//! Normalization turns raw recognizer output into candidate plate text;
//! matching finds the registry record a confirmed candidate belongs to.
//! Both are pure functions so they can be exercised without a camera
//! or a network.

mod matcher;
mod normalize;

pub use matcher::{match_plate, plates_match, strip_whitespace};
pub use normalize::{is_plate_char, normalize, PlateValidator, Rejection, MIN_PLATE_LEN};
