/// numeric derivative and Romberg antiderivative
/// Example#1
/// ```
/// use RustedGrapher::numerical::calculus::{five_point_derivative, romberg};
/// let slope = five_point_derivative(|x| x * x, 3.0, 1e-3);
/// assert!((slope - 6.0).abs() < 1e-4);
/// let area = romberg(|x| x, 0.0, 2.0, 8, 20).unwrap();
/// println!("area = {} after {} rows", area.value, area.iterations);
/// ```
pub mod calculus;
