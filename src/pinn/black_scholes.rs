use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A European call option under Black-Scholes dynamics.
///
/// The network input is `(S, t)`: the underlying's price and the time elapsed since issue, so the
/// time to expiry is `maturity - t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackScholes {
    pub strike: f32,
    pub rate: f32,
    pub volatility: f32,
    pub maturity: f32,
    /// Upper bound of the sampled price range.
    pub s_max: f32,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            strike: 10.0,
            rate: 0.05,
            volatility: 0.2,
            maturity: 1.0,
            s_max: 20.0,
        }
    }
}

impl BlackScholes {
    /// Closed-form call price `C(S, t)`. At or past expiry this is the payoff.
    pub fn call_price(&self, s: f32, t: f32) -> f32 {
        let (s, k, r, sigma) = (
            s as f64,
            self.strike as f64,
            self.rate as f64,
            self.volatility as f64,
        );
        let tau = (self.maturity - t) as f64;

        if tau <= 0.0 || s <= 0.0 {
            return (s - k).max(0.0) as f32;
        }

        let vol = sigma * tau.sqrt();
        let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * tau) / vol;
        let d2 = d1 - vol;

        (s * norm_cdf(d1) - k * (-r * tau).exp() * norm_cdf(d2)) as f32
    }

    /// Samples `n` collocation points uniformly over `[0, s_max] x [0, maturity]`.
    ///
    /// # Returns
    /// The `(n, 2)` inputs and the `(n, 1)` closed-form prices for them.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> (Array2<f32>, Array2<f32>) {
        let mut x = Array2::zeros((n, 2));
        let mut y = Array2::zeros((n, 1));

        for i in 0..n {
            let s = rng.random_range(0.0..=self.s_max);
            let t = rng.random_range(0.0..=self.maturity);
            x[[i, 0]] = s;
            x[[i, 1]] = t;
            y[[i, 0]] = self.call_price(s, t);
        }

        (x, y)
    }
}

/// Standard normal CDF.
fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}
