//! Time handling: MJD instants, block instant parsing and sidereal time.

pub mod mjd;
pub mod sidereal;

pub use mjd::{parse_block_instant, ModifiedJulianDate, BLOCK_INSTANT_FORMAT};
pub use sidereal::{local_sidereal_time, sidereal_gap, sidereal_to_solar, SIDEREAL_RATE};
