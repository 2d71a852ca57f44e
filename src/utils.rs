pub struct Utils;

impl Utils {
    pub fn round(x: f64, decimals: u32) -> f64 {
        let y = 10i32.pow(decimals) as f64;
        (x * y).round() / y
    }

    /// Rounds an f32 reading to one decimal, going through f64 so that
    /// e.g. 53.4f32 comes out as 53.4 rather than 53.400001525878906.
    pub fn round_reading(x: f32) -> f64 {
        Self::round(f64::from(x), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(Utils::round_reading(53.4), 53.4);
        assert_eq!(Utils::round_reading(-0.04), -0.0);
        assert_eq!(Utils::round(54519.1016, 1), 54519.1);
    }
}
