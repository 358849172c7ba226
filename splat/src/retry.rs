use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use rand::{Rng, SeedableRng};

use crate::time::Millis;

/// Decides whether a failed stage of work should be attempted again,
/// and how long to wait before doing so.
///
/// It does not _contain_ the work to be done; it lives alongside it
/// and is consulted every time the work fails.
///
/// Delays are measured from the moment of the failure, so an attempt
/// that itself takes a long time (e.g. waiting out a response timeout)
/// is still followed by the full delay.
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use splat::retry::{Attempts, RetryTimer, Strategy, YouShould};
///
/// let mut calls = 0;
/// let mut fails_once = || -> Result<(), ()> {
///   calls += 1;
///   if calls == 1 { Err(()) } else { Ok(()) }
/// };
///
/// let strategy = Strategy::Delay { min: Milliseconds(10),
///                                  max: Milliseconds(10) };
/// let mut retry = RetryTimer::new(0, strategy, Attempts(2));
///
/// while let Err(_) = fails_once() {
///   match retry.what_should_i_do() {
///     | YouShould::Retry { after } => std::thread::sleep(std::time::Duration::from_millis(after.0)),
///     | YouShould::Cry => panic!("no more attempts! it failed more than once!!"),
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer {
  init: Millis,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer.what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed once `after` has elapsed
  Retry {
    /// How long to wait before the next attempt
    after: Millis,
  },
}

impl RetryTimer {
  /// Create a new retrier.
  ///
  /// `seed` is only used when the strategy has jitter (`min != max`);
  /// passing the current time keeps a fleet of devices from retrying in lockstep.
  pub fn new(seed: u64, strategy: Strategy, max_attempts: Attempts) -> Self {
    Self { strategy,
           init: if strategy.has_jitter() {
             let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
             Milliseconds(rand.gen_range(strategy.range()))
           } else {
             Milliseconds(*strategy.range().start())
           },
           max_attempts,
           attempts: Attempts(1) }
  }

  /// When the thing we keep trying fails, invoke this to
  /// tell the retrytimer "it failed again! what do I do??"
  ///
  /// The first attempt is assumed to have happened before
  /// the first call.
  pub fn what_should_i_do(&mut self) -> YouShould {
    if self.attempts >= self.max_attempts {
      YouShould::Cry
    } else {
      let after = self.delay_after(self.attempts.0);
      self.attempts.0 += 1;
      YouShould::Retry { after }
    }
  }

  /// Number of attempts made (or about to be made) so far
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }

  /// The delay the strategy prescribes after the `attempt`-th failure
  pub fn delay_after(&self, attempt: u16) -> Millis {
    if attempt == 0 {
      return Milliseconds(0);
    }

    match self.strategy {
      | Strategy::Delay { .. } => self.init,
      | Strategy::Exponential { .. } => Milliseconds(Strategy::delay_exp(self.init, attempt)),
    }
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  ///
  /// After each failed attempt, double the delay before retrying again.
  Exponential {
    /// Minimum (inclusive) delay for second attempt
    init_min: Millis,
    /// Maximum (inclusive) delay for second attempt
    init_max: Millis,
  },
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  Delay {
    /// Minimum (inclusive) delay for attempts
    min: Millis,
    /// Maximum (inclusive) delay for attempts
    max: Millis,
  },
}

impl Strategy {
  /// A fixed delay with no jitter
  pub const fn fixed(delay: Millis) -> Self {
    Self::Delay { min: delay,
                  max: delay }
  }

  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => (min..=max),

      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => (min..=max),
    }
  }

  /// Get the total time spent waiting between attempts if all of them fail
  pub fn max_time(&self, max_attempts: Attempts) -> Millis {
    let waits = max_attempts.0.saturating_sub(1);
    Milliseconds(match self {
                   | Self::Exponential { init_max, .. } => {
                     (1..=waits).map(|n| Self::delay_exp(*init_max, n)).sum()
                   },
                   | Self::Delay { max: Milliseconds(max),
                                   .. } => max * waits as u64,
                 })
  }

  /// Given the initial delay and the number of failures so far,
  /// yields the delay until the next attempt.
  const fn delay_exp(Milliseconds(init): Milliseconds<u64>, attempt: u16) -> u64 {
    // | attempt | delay    |
    // | 1       | init     |
    // | 2       | init * 2 |
    // | 3       | init * 4 |
    // | n       | init * 2^(n-1) |
    init * 2u64.pow((attempt - 1) as u32)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn delay_retrier() {
    let mut retry = RetryTimer::new(0, Strategy::fixed(Milliseconds(1000)), Attempts(3));

    // attempt 1 happens before asking what_should_i_do
    assert_eq!(retry.what_should_i_do(),
               YouShould::Retry { after: Milliseconds(1000) });
    assert_eq!(retry.what_should_i_do(),
               YouShould::Retry { after: Milliseconds(1000) });
    assert_eq!(retry.what_should_i_do(), YouShould::Cry);
    assert_eq!(retry.what_should_i_do(), YouShould::Cry);
    assert_eq!(retry.attempts(), Attempts(3));
  }

  #[test]
  fn single_attempt_never_retries() {
    let mut retry = RetryTimer::new(0, Strategy::fixed(Milliseconds(1000)), Attempts(1));
    assert_eq!(retry.what_should_i_do(), YouShould::Cry);
  }

  #[test]
  fn exponential_retrier() {
    let mut retry = RetryTimer::new(0,
                                    Strategy::Exponential { init_min: Milliseconds(1000),
                                                            init_max: Milliseconds(1000) },
                                    Attempts(4));

    assert_eq!(retry.what_should_i_do(),
               YouShould::Retry { after: Milliseconds(1000) });
    assert_eq!(retry.what_should_i_do(),
               YouShould::Retry { after: Milliseconds(2000) });
    assert_eq!(retry.what_should_i_do(),
               YouShould::Retry { after: Milliseconds(4000) });
    assert_eq!(retry.what_should_i_do(), YouShould::Cry);
  }

  #[test]
  fn jitter_stays_in_range() {
    let strategy = Strategy::Delay { min: Milliseconds(500),
                                     max: Milliseconds(1500) };

    (0..32u64).for_each(|seed| {
                match RetryTimer::new(seed, strategy, Attempts(2)).what_should_i_do() {
                  | YouShould::Retry { after: Milliseconds(ms) } => {
                    assert!((500..=1500).contains(&ms), "{}", ms)
                  },
                  | YouShould::Cry => panic!("should retry once"),
                }
              });
  }

  #[test]
  fn max_time() {
    assert_eq!(Strategy::fixed(Milliseconds(10_000)).max_time(Attempts(3)),
               Milliseconds(20_000u64));
    assert_eq!(Strategy::Exponential { init_min: Milliseconds(100),
                                       init_max: Milliseconds(100) }.max_time(Attempts(4)),
               Milliseconds(700u64));
  }

  #[test]
  fn exp_calculation() {
    let init = Milliseconds(100);
    assert_eq!(Strategy::delay_exp(init, 1), 100);
    assert_eq!(Strategy::delay_exp(init, 2), 200);
    assert_eq!(Strategy::delay_exp(init, 3), 400);
  }
}
