/// Extensions to Result
pub(crate) trait ResultExt<T, E>: Sized {
  /// Perform some side-effect with the `Ok` value
  fn perform(self, f: impl FnOnce(&T)) -> Result<T, E>;

  /// Perform some side-effect with the `Err` value
  fn perform_err(self, f: impl FnOnce(&E)) -> Result<T, E>;

  /// Keep the `Ok` value if `pred` holds, otherwise
  /// replace it with the error made by `on_fail`
  fn filter(self, pred: impl FnOnce(&T) -> bool, on_fail: impl FnOnce(&T) -> E) -> Result<T, E>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
  fn perform(self, f: impl FnOnce(&T)) -> Result<T, E> {
    self.map(|t| {
          f(&t);
          t
        })
  }

  fn perform_err(self, f: impl FnOnce(&E)) -> Result<T, E> {
    self.map_err(|e| {
          f(&e);
          e
        })
  }

  fn filter(self, pred: impl FnOnce(&T) -> bool, on_fail: impl FnOnce(&T) -> E) -> Result<T, E> {
    self.and_then(|t| if pred(&t) { Ok(t) } else { Err(on_fail(&t)) })
  }
}
