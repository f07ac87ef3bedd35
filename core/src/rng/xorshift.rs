//! xorshift64* random number generator
//!
//! This is a fast, high-quality PRNG that is deterministic and suitable
//! for simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers. This is CRITICAL for:
//! - Debugging (reproduce exact simulation)
//! - Testing (verify behavior)
//! - Research (validate results)

use serde::{Deserialize, Serialize};

/// Errors raised by the RNG state machine itself (not by caller misuse,
/// which is still asserted/panicked as before).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngError {
    /// The xorshift state transitioned to zero, its only fixed point.
    /// Recovery isn't possible from inside the generator: the caller must
    /// treat this as a fatal, unrecoverable simulation error.
    InvalidRngState,
}

impl std::fmt::Display for RngError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RngError::InvalidRngState => write!(f, "RNG state degenerated to zero"),
        }
    }
}

impl std::error::Error for RngError {}

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use payment_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next().unwrap();
/// let range_value = rng.range(0, 100).unwrap(); // [0, 100)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// # Arguments
    /// * `seed` - Initial seed value (u64)
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::RngManager;
    ///
    /// let rng = RngManager::new(12345);
    /// ```
    pub fn new(seed: u64) -> Self {
        // Ensure seed is never zero (xorshift requirement)
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    ///
    /// This advances the internal state and returns a random value.
    ///
    /// # Errors
    /// Returns `RngError::InvalidRngState` if the xorshift transform drives
    /// the state to zero, its degenerate fixed point. `new` already guards
    /// against a zero seed, so this should not occur in practice; it is
    /// checked anyway because a silently-stuck RNG would produce an
    /// infinite run of identical outputs.
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let value = rng.next().unwrap();
    /// ```
    pub fn next(&mut self) -> Result<u64, RngError> {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        if x == 0 {
            return Err(RngError::InvalidRngState);
        }
        self.state = x;
        Ok(x.wrapping_mul(0x2545F4914F6CDD1D))
    }

    /// Generate random value in range [min, max)
    ///
    /// # Arguments
    /// * `min` - Minimum value (inclusive)
    /// * `max` - Maximum value (exclusive)
    ///
    /// # Panics
    /// Panics if min >= max
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let amount = rng.range(10000, 100000).unwrap(); // $100 to $1000 in cents
    /// ```
    pub fn range(&mut self, min: i64, max: i64) -> Result<i64, RngError> {
        assert!(min < max, "min must be less than max");

        let value = self.next()?;
        let range_size = (max - min) as u64;
        Ok(min + (value % range_size) as i64)
    }

    /// Get current RNG state (for checkpointing/replay)
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::RngManager;
    ///
    /// let rng = RngManager::new(12345);
    /// let state = rng.get_state();
    ///
    /// // Later, can recreate RNG from this state
    /// let rng2 = RngManager::new(state);
    /// ```
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    ///
    /// Useful for sampling from probability distributions.
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let probability = rng.next_f64().unwrap();
    /// assert!(probability >= 0.0 && probability < 1.0);
    /// ```
    pub fn next_f64(&mut self) -> Result<f64, RngError> {
        let value = self.next()?;
        // Convert to [0.0, 1.0) by dividing by 2^64
        Ok((value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64)))
    }

    /// Sample from a Poisson distribution with the given mean (lambda).
    ///
    /// Uses Knuth's product-of-uniforms method. Fine for the small-to-moderate
    /// rates this simulator deals with (arrival rates per tick); a large-lambda
    /// rejection method is not needed at this scale.
    ///
    /// # Panics
    /// Panics if `lambda` is not positive.
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let count = rng.poisson(2.5).unwrap();
    /// ```
    pub fn poisson(&mut self, lambda: f64) -> Result<u64, RngError> {
        assert!(lambda > 0.0, "lambda must be positive");

        let l = (-lambda).exp();
        let mut k = 0u64;
        let mut p = 1.0;

        loop {
            k += 1;
            p *= self.next_f64()?;
            if p <= l {
                break;
            }
        }

        Ok(k - 1)
    }

    /// Sample from a standard normal distribution using the Box-Muller transform.
    ///
    /// Each call produces one sample (the paired cosine branch); the sine branch
    /// is discarded rather than cached, keeping the RNG's state advancement
    /// independent of caller call order.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> Result<f64, RngError> {
        let u1 = self.next_f64()?.max(f64::MIN_POSITIVE);
        let u2 = self.next_f64()?;
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        Ok(mean + std_dev * z)
    }

    /// Sample from a log-normal distribution parameterized by the mean and
    /// standard deviation of the underlying normal.
    pub fn log_normal(&mut self, mean: f64, std_dev: f64) -> Result<f64, RngError> {
        Ok(self.normal(mean, std_dev)?.exp())
    }
}
