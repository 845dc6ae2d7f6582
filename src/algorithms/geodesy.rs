//! Great-circle distance on a spherical Earth
//!
//! All distances in this crate go through [`distance`], which applies the
//! haversine formula with the mean Earth radius. Inputs are decimal degrees and
//! are not range-checked; non-finite inputs propagate as NaN.

use crate::core::{Geodetic, EARTH_RADIUS_M};

/// Haversine distance in meters between two coordinates in decimal degrees
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Distance in meters between any two geodetic items
pub fn distance_between<A: Geodetic, B: Geodetic>(a: &A, b: &B) -> f64 {
    distance(a.latitude(), a.longitude(), b.latitude(), b.longitude())
}

/// Latitude offset (degrees) that spans `meters` along a meridian
pub fn meters_to_latitude_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}
