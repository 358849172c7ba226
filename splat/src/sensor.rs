use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A single reading from the device's sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
  /// Degrees celsius
  pub temperature: f32,
  /// Relative humidity, percent
  pub humidity: u16,
}

/// Something that can be sampled for temperature & humidity
pub trait Sensor {
  /// The error yielded when a reading fails
  type Error: core::fmt::Debug;

  /// Take a reading
  fn read(&mut self) -> Result<Sample, Self::Error>;
}

impl<S: Sensor> Sensor for &mut S {
  type Error = S::Error;

  fn read(&mut self) -> Result<Sample, Self::Error> {
    S::read(self)
  }
}

/// A sensor that wanders around a baseline reading
///
/// ```
/// use splat::sensor::{Sample, Sensor, Simulated};
///
/// let mut sensor = Simulated::new(0, Sample { temperature: 20.0, humidity: 50 });
/// let Sample { temperature, humidity } = sensor.read().unwrap();
///
/// assert!((19.0..=21.0).contains(&temperature));
/// assert!((45..=55).contains(&humidity));
/// ```
#[derive(Debug, Clone)]
pub struct Simulated {
  rng: ChaCha8Rng,
  baseline: Sample,
}

impl Simulated {
  /// Create a simulated sensor
  pub fn new(seed: u64, baseline: Sample) -> Self {
    Self { rng: ChaCha8Rng::seed_from_u64(seed),
           baseline }
  }
}

impl Sensor for Simulated {
  type Error = core::convert::Infallible;

  fn read(&mut self) -> Result<Sample, Self::Error> {
    let temperature = self.baseline.temperature + self.rng.gen_range(-1.0f32..=1.0);
    let humidity = self.baseline
                       .humidity
                       .saturating_add(self.rng.gen_range(0..=10))
                       .saturating_sub(5)
                       .min(100);

    Ok(Sample { temperature,
                humidity })
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn simulated_is_deterministic() {
    let base = Sample { temperature: 20.0,
                        humidity: 98 };
    let mut a = Simulated::new(7, base);
    let mut b = Simulated::new(7, base);

    (0..16).for_each(|_| {
             let sample = a.read().unwrap();
             assert_eq!(sample, b.read().unwrap());
             assert!(sample.humidity <= 100);
           });
  }
}
