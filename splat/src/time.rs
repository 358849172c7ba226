use embedded_time::duration::Milliseconds;

/// A duration, in milliseconds
pub type Millis = embedded_time::duration::Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Suspend the calling thread.
///
/// Every wait in `splat` (polling for a response, backing off
/// between retries, the upload schedule) goes through this trait,
/// so tests can substitute a clock that advances instantly.
pub trait Sleep {
  /// Block the calling thread for (at least) `dur`
  fn sleep(&self, dur: Millis);
}

impl<T: Sleep> Sleep for &T {
  fn sleep(&self, dur: Millis) {
    T::sleep(self, dur)
  }
}

/// Milliseconds elapsed since `since` (as returned by [`now_millis`]),
/// saturating at zero if the clock went backwards.
pub fn elapsed<C: Clock>(clock: &C, since: Millis) -> Millis {
  Milliseconds(now_millis(clock).0.saturating_sub(since.0))
}

/// Milliseconds since the clock's epoch, zero if the clock failed.
pub fn now_millis<C: Clock>(clock: &C) -> Millis {
  clock.try_now()
       .ok()
       .and_then(|now| Millis::try_from(now.duration_since_epoch()).ok())
       .unwrap_or(Milliseconds(0))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::test::ClockMock;

  #[test]
  fn elapsed_since() {
    let clock = ClockMock::new();
    clock.set(1_500);
    assert_eq!(now_millis(&clock), Milliseconds(1_500u64));

    let start = now_millis(&clock);
    clock.sleep(Milliseconds(250));
    assert_eq!(elapsed(&clock, start), Milliseconds(250u64));

    // clock went backwards
    clock.set(0);
    assert_eq!(elapsed(&clock, start), Milliseconds(0u64));
  }
}
