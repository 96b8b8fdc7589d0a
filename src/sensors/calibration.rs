use std::fmt;

use thiserror::Error;

/// pH of the acidic buffer used by the two-buffer calibration.
pub const PH4_BUFFER: f64 = 4.0;
/// pH of the neutral buffer used by the two-buffer calibration.
pub const PH7_BUFFER: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("both calibration points have the same voltage")]
    EqualVoltages,

    #[error("two calibration points share the same voltage")]
    DuplicateVoltage,

    #[error("sum of squared voltage deviations is zero")]
    ZeroDenominator,

    #[error("slope would be zero, every voltage would map to the same value")]
    ZeroSlope,

    #[error("calibration input is not a finite number")]
    NonFinite,
}

/// A measured voltage and the value the probe should report for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub voltage: f64,
    pub reference: f64,
}

impl CalibrationPoint {
    pub const fn new(voltage: f64, reference: f64) -> Self {
        Self { voltage, reference }
    }

    fn is_finite(&self) -> bool {
        self.voltage.is_finite() && self.reference.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMethod {
    TwoPoint,
    ThreePoint,
    Buffers,
    Offset,
    Direct,
    Reset,
}

impl fmt::Display for CalibrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalibrationMethod::TwoPoint => "two-point",
            CalibrationMethod::ThreePoint => "three-point",
            CalibrationMethod::Buffers => "pH 4/7 buffers",
            CalibrationMethod::Offset => "offset",
            CalibrationMethod::Direct => "direct",
            CalibrationMethod::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// `value = slope * voltage + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCoefficients {
    pub slope: f64,
    pub intercept: f64,
}

impl CalibrationCoefficients {
    /// Generic analog pH probe behind a 3.3 V front end.
    pub const DEFAULT: Self = Self {
        slope: -6.80,
        intercept: 25.85,
    };

    pub fn new(slope: f64, intercept: f64) -> Result<Self, CalibrationError> {
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(CalibrationError::NonFinite);
        }
        if slope == 0.0 {
            return Err(CalibrationError::ZeroSlope);
        }

        Ok(Self { slope, intercept })
    }

    #[inline]
    pub fn apply(&self, voltage: f64) -> f64 {
        self.slope * voltage + self.intercept
    }

    pub fn two_point(a: CalibrationPoint, b: CalibrationPoint) -> Result<Self, CalibrationError> {
        if !a.is_finite() || !b.is_finite() {
            return Err(CalibrationError::NonFinite);
        }
        if a.voltage == b.voltage {
            return Err(CalibrationError::EqualVoltages);
        }

        let slope = (b.reference - a.reference) / (b.voltage - a.voltage);
        Self::new(slope, a.reference - slope * a.voltage)
    }

    /// Ordinary least squares over three points.
    pub fn three_point(points: [CalibrationPoint; 3]) -> Result<Self, CalibrationError> {
        Self::least_squares(&points)
    }

    /// Ordinary least squares fit. Rejects any two points with the same voltage.
    pub fn least_squares(points: &[CalibrationPoint]) -> Result<Self, CalibrationError> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(CalibrationError::NonFinite);
        }
        for (i, p) in points.iter().enumerate() {
            if points[i + 1..].iter().any(|q| q.voltage == p.voltage) {
                return Err(CalibrationError::DuplicateVoltage);
            }
        }
        if points.len() < 2 {
            return Err(CalibrationError::ZeroDenominator);
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.voltage).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.reference).sum::<f64>() / n;

        let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), p| {
            let dx = p.voltage - mean_x;
            (cov + dx * (p.reference - mean_y), var + dx * dx)
        });

        if variance == 0.0 {
            return Err(CalibrationError::ZeroDenominator);
        }

        let slope = covariance / variance;
        Self::new(slope, mean_y - slope * mean_x)
    }

    /// Classic pH 4.0 / pH 7.0 buffer calibration.
    pub fn from_buffers(ph4_voltage: f64, ph7_voltage: f64) -> Result<Self, CalibrationError> {
        Self::two_point(
            CalibrationPoint::new(ph4_voltage, PH4_BUFFER),
            CalibrationPoint::new(ph7_voltage, PH7_BUFFER),
        )
    }

    /// Shifts the intercept so `measured` would have read `truth`. The slope is untouched.
    pub fn with_offset(&self, measured: f64, truth: f64) -> Result<Self, CalibrationError> {
        Self::new(self.slope, self.intercept + (truth - measured))
    }

    /// Sum of squared residuals of this model over `points`.
    pub fn residual(&self, points: &[CalibrationPoint]) -> f64 {
        points
            .iter()
            .map(|p| {
                let r = self.apply(p.voltage) - p.reference;
                r * r
            })
            .sum()
    }
}

impl Default for CalibrationCoefficients {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CalibrationCoefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={:.4}, c={:.4}", self.slope, self.intercept)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn two_point_scenario() {
        let cal = CalibrationCoefficients::two_point(
            CalibrationPoint::new(3.0, 4.0),
            CalibrationPoint::new(2.0, 7.0),
        )
        .unwrap();

        assert_relative_eq!(cal.slope, -3.0, epsilon = 1e-12);
        assert_relative_eq!(cal.intercept, 13.0, epsilon = 1e-12);
    }

    #[test]
    fn two_point_rejects_equal_voltages() {
        let result = CalibrationCoefficients::two_point(
            CalibrationPoint::new(1.5, 4.0),
            CalibrationPoint::new(1.5, 7.0),
        );

        assert_eq!(result, Err(CalibrationError::EqualVoltages));
    }

    #[test]
    fn two_point_rejects_flat_references() {
        let result = CalibrationCoefficients::two_point(
            CalibrationPoint::new(1.0, 7.0),
            CalibrationPoint::new(2.0, 7.0),
        );

        assert_eq!(result, Err(CalibrationError::ZeroSlope));
    }

    #[test]
    fn three_point_rejects_duplicate_voltage() {
        let result = CalibrationCoefficients::three_point([
            CalibrationPoint::new(1.0, 4.0),
            CalibrationPoint::new(2.0, 7.0),
            CalibrationPoint::new(1.0, 10.0),
        ]);

        assert_eq!(result, Err(CalibrationError::DuplicateVoltage));
    }

    #[test]
    fn three_point_agrees_with_two_point_on_collinear_points() {
        let points = [
            CalibrationPoint::new(2.5, 4.0),
            CalibrationPoint::new(2.0, 7.0),
            CalibrationPoint::new(1.5, 10.0),
        ];

        let three = CalibrationCoefficients::three_point(points).unwrap();
        let two = CalibrationCoefficients::two_point(points[0], points[2]).unwrap();

        assert_relative_eq!(three.slope, two.slope, epsilon = 1e-9);
        assert_relative_eq!(three.intercept, two.intercept, epsilon = 1e-9);
        assert_relative_eq!(three.residual(&points), 0.0, epsilon = 1e-18);
    }

    #[test]
    fn three_point_fits_noisy_buffers() {
        // Slope -6, intercept 22 with +/-0.1 pH of noise on the middle point.
        let points = [
            CalibrationPoint::new(3.0, 4.0),
            CalibrationPoint::new(2.5, 7.1),
            CalibrationPoint::new(2.0, 10.0),
        ];

        let cal = CalibrationCoefficients::three_point(points).unwrap();

        assert_relative_eq!(cal.slope, -6.0, epsilon = 1e-9);
        assert_relative_eq!(cal.intercept, 22.0 + 0.1 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn buffers_map_to_ph4_and_ph7() {
        let cal = CalibrationCoefficients::from_buffers(3.05, 2.54).unwrap();

        assert_relative_eq!(cal.apply(3.05), PH4_BUFFER, epsilon = 1e-9);
        assert_relative_eq!(cal.apply(2.54), PH7_BUFFER, epsilon = 1e-9);
    }

    #[test]
    fn offset_moves_intercept_only() {
        let cal = CalibrationCoefficients::DEFAULT.with_offset(6.8, 7.0).unwrap();

        assert_eq!(cal.slope.to_bits(), CalibrationCoefficients::DEFAULT.slope.to_bits());
        assert_relative_eq!(cal.intercept, 26.05, epsilon = 1e-12);
    }

    #[test]
    fn offset_rejects_non_finite_intercept() {
        let cal = CalibrationCoefficients::DEFAULT;

        assert_eq!(cal.with_offset(f64::NAN, 7.0), Err(CalibrationError::NonFinite));
        assert_eq!(cal.with_offset(6.8, f64::INFINITY), Err(CalibrationError::NonFinite));
        // Both inputs finite, but truth - measured overflows.
        assert_eq!(cal.with_offset(-1e308, 1e308), Err(CalibrationError::NonFinite));
    }

    #[test]
    fn new_rejects_degenerate_coefficients() {
        assert_eq!(
            CalibrationCoefficients::new(0.0, 1.0),
            Err(CalibrationError::ZeroSlope)
        );
        assert_eq!(
            CalibrationCoefficients::new(f64::NAN, 1.0),
            Err(CalibrationError::NonFinite)
        );
        assert_eq!(
            CalibrationCoefficients::new(-5.7, 21.34),
            Ok(CalibrationCoefficients {
                slope: -5.7,
                intercept: 21.34
            })
        );
    }

    proptest! {
        #[test]
        fn two_point_reproduces_references(
            va in 0.0f64..3.3,
            vb in 0.0f64..3.3,
            ra in 0.0f64..14.0,
            rb in 0.0f64..14.0,
        ) {
            prop_assume!((va - vb).abs() > 1e-3);
            prop_assume!((ra - rb).abs() > 1e-3);

            let cal = CalibrationCoefficients::two_point(
                CalibrationPoint::new(va, ra),
                CalibrationPoint::new(vb, rb),
            ).unwrap();

            prop_assert!((cal.apply(va) - ra).abs() < 1e-9);
            prop_assert!((cal.apply(vb) - rb).abs() < 1e-9);
        }

        #[test]
        fn least_squares_beats_perturbed_lines(
            v in prop::array::uniform3(0.0f64..3.3),
            r in prop::array::uniform3(0.0f64..14.0),
            ds in -1.0f64..1.0,
            di in -1.0f64..1.0,
        ) {
            prop_assume!((v[0] - v[1]).abs() > 1e-2);
            prop_assume!((v[0] - v[2]).abs() > 1e-2);
            prop_assume!((v[1] - v[2]).abs() > 1e-2);

            let points = [
                CalibrationPoint::new(v[0], r[0]),
                CalibrationPoint::new(v[1], r[1]),
                CalibrationPoint::new(v[2], r[2]),
            ];

            if let Ok(fit) = CalibrationCoefficients::three_point(points) {
                let other = CalibrationCoefficients {
                    slope: fit.slope + ds,
                    intercept: fit.intercept + di,
                };
                prop_assert!(fit.residual(&points) <= other.residual(&points) + 1e-9);
            }
        }
    }
}
