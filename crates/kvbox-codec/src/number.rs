/// Render a finite float the way both text codecs expect it.
///
/// Integral values print without a fraction, very large and very small
/// magnitudes switch to exponent notation. Output always parses back to the
/// same `f64`.
pub(crate) fn format_finite(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let magnitude = f.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        format!("{f:e}")
    } else {
        f.to_string()
    }
}
