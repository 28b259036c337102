use rand::Rng;

/// Draw from an exponential distribution with the given mean.
pub fn sample_exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    let u: f64 = rng.gen();
    -mean * (1.0 - u).ln()
}

/// How long a simulated job takes on the client, and on the faster server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workload {
    /// Local execution cost L, also the input when run locally
    pub execution_secs: f64,
    /// Input sent to the server: L reduced by the acceleration factor
    pub accelerated_secs: f64,
}

impl Workload {
    pub fn new(execution_secs: f64, acceleration_factor: f64) -> Self {
        Self {
            execution_secs,
            accelerated_secs: execution_secs - acceleration_factor * execution_secs,
        }
    }

    pub fn sample<R: Rng + ?Sized>(rng: &mut R, mean_secs: f64, acceleration_factor: f64) -> Self {
        Self::new(sample_exponential(rng, mean_secs), acceleration_factor)
    }
}
