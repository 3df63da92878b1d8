use core::f64::consts::TAU;

/// Wraps an angle into `[0, 2pi)`.
pub fn wrap(angle: f64) -> f64 {
    let wrapped = libm::fmod(angle, TAU);
    let wrapped = if wrapped < 0.0 { wrapped + TAU } else { wrapped };
    // fmod of a tiny negative angle plus TAU rounds up to TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        use rand_distr::{Uniform, Distribution};

        let dist = Uniform::new(-100.0, 100.0);
        let mut rng = rand::thread_rng();

        for i in 0..10000 {
            let x: f64 = dist.sample(&mut rng);
            let wrapped = wrap(x);
            assert!(wrapped >= 0.0 && wrapped < TAU, "{}: {} wrapped to {}", i, x, wrapped);

            let turns = (x - wrapped) / TAU;
            assert!((turns - turns.round()).abs() < 1e-9, "{}: {} wrapped to {}", i, x, wrapped);
        }
    }

    #[test]
    fn test_wrap_edges() {
        assert_eq!(wrap(0.0), 0.0);
        assert_eq!(wrap(TAU), 0.0);
        assert_eq!(wrap(-1e-300), 0.0);
        assert!((wrap(-core::f64::consts::PI) - core::f64::consts::PI).abs() < 1e-12);
    }
}
