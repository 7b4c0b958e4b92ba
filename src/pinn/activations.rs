#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActFn {
    Tanh,
}
use ActFn::*;

impl ActFn {
    pub fn f(&self, z: f32) -> f32 {
        match self {
            Tanh => z.tanh(),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Tanh => 1. - z.tanh().powi(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tanh_derivative_matches_finite_differences() {
        let h = 1e-3;
        for z in [-2.0f32, -0.5, 0.0, 0.3, 1.7] {
            let numeric = (Tanh.f(z + h) - Tanh.f(z - h)) / (2. * h);
            assert!((numeric - Tanh.df(z)).abs() < 1e-3, "z = {z}");
        }
    }
}
