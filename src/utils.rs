use std::f64::consts::TAU;

/// Linear interpolation between two f64 values
pub fn lerp(start: f64, end: f64, alpha: f64) -> f64 {
    start + (end - start) * alpha
}

/// Greatest common divisor (gcd(0, n) == n)
pub fn gcd(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Wrap an angle in radians into [0, 2pi)
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Angle of `bucket` out of `buckets` equal directions, in radians
pub fn bucket_angle(bucket: u32, buckets: u32) -> f64 {
    bucket as f64 / buckets as f64 * TAU
}
