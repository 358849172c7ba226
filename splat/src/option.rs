/// Content-Format
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
  /// `text/plain; charset=utf-8`
  Text,
  /// `application/link-format`
  LinkFormat,
  /// `application/xml`
  Xml,
  /// `application/octet-stream`
  OctetStream,
  /// `application/exi`
  Exi,
  /// `application/json`
  Json,
  /// Another content format
  Other(u16),
}

impl ContentFormat {
  /// Convert this content format to a CoAP option value.
  ///
  /// CoAP `uint` values are sent without leading zero bytes,
  /// so `text/plain` (0) is the empty value.
  ///
  /// ```
  /// use splat::ContentFormat;
  ///
  /// assert_eq!(ContentFormat::Text.bytes(), Vec::<u8>::new());
  /// assert_eq!(ContentFormat::Json.bytes(), vec![50]);
  /// assert_eq!(ContentFormat::Other(1000).bytes(), vec![3, 232]);
  /// ```
  pub fn bytes(&self) -> Vec<u8> {
    u16::from(self).to_be_bytes()
                   .into_iter()
                   .skip_while(|b| *b == 0)
                   .collect()
  }

  /// Parse a CoAP option value
  pub fn from_bytes(bytes: &[u8]) -> Self {
    let n = bytes.iter()
                 .fold(0u32, |n, b| (n << 8) | *b as u32)
                 .min(u16::MAX as u32) as u16;
    Self::from(n)
  }
}

impl<'a> From<&'a ContentFormat> for u16 {
  fn from(f: &'a ContentFormat) -> Self {
    use ContentFormat::*;
    match *f {
      | Text => 0,
      | LinkFormat => 40,
      | Xml => 41,
      | OctetStream => 42,
      | Exi => 47,
      | Json => 50,
      | Other(n) => n,
    }
  }
}

impl From<u16> for ContentFormat {
  fn from(n: u16) -> Self {
    use ContentFormat::*;
    match n {
      | 0 => Text,
      | 40 => LinkFormat,
      | 41 => Xml,
      | 42 => OctetStream,
      | 47 => Exi,
      | 50 => Json,
      | n => Other(n),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn parses_what_it_writes() {
    [ContentFormat::Text,
     ContentFormat::Json,
     ContentFormat::OctetStream,
     ContentFormat::Other(1000)].into_iter()
                                .for_each(|f| assert_eq!(ContentFormat::from_bytes(&f.bytes()), f));
  }

  #[test]
  fn leading_zeroes_are_ignored() {
    assert_eq!(ContentFormat::from_bytes(&[0, 0]), ContentFormat::Text);
    assert_eq!(ContentFormat::from_bytes(&[0, 50]), ContentFormat::Json);
  }
}
