// Numeric folds used by the built-in operators. Every operation has at least
// one input.

#[inline(always)]
pub fn add(xs: &[f64]) -> f64 {
  xs.iter().sum()
}

#[inline(always)]
pub fn sub(xs: &[f64]) -> f64 {
  fold(xs, |a, b| a - b)
}

#[inline(always)]
pub fn mul(xs: &[f64]) -> f64 {
  xs.iter().product()
}

#[inline(always)]
pub fn div(xs: &[f64]) -> f64 {
  fold(xs, |a, b| a / b)
}

#[inline(always)]
pub fn rem(xs: &[f64]) -> f64 {
  fold(xs, |a, b| a % b)
}

#[inline(always)]
pub fn min(xs: &[f64]) -> f64 {
  fold(xs, f64::min)
}

#[inline(always)]
pub fn max(xs: &[f64]) -> f64 {
  fold(xs, f64::max)
}

#[inline(always)]
pub fn ltn(xs: &[f64]) -> f64 {
  chain(xs, |a, b| a < b)
}

#[inline(always)]
pub fn eql(xs: &[f64]) -> f64 {
  chain(xs, |a, b| a == b)
}

#[inline(always)]
pub fn gtn(xs: &[f64]) -> f64 {
  chain(xs, |a, b| a > b)
}

fn fold(xs: &[f64], f: impl Fn(f64, f64) -> f64) -> f64 {
  match xs.split_first() {
    Some((head, tail)) => tail.iter().fold(*head, |a, b| f(a, *b)),
    None => f64::NAN,
  }
}

fn chain(xs: &[f64], f: impl Fn(f64, f64) -> bool) -> f64 {
  if xs.windows(2).all(|w| f(w[0], w[1])) {
    1.0
  } else {
    0.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn folds_run_left_to_right() {
    assert_eq!(add(&[1.0, 2.0, 3.5]), 6.5);
    assert_eq!(sub(&[10.0, 3.0, 2.0]), 5.0);
    assert_eq!(mul(&[2.0, 3.0, 4.0]), 24.0);
    assert_eq!(div(&[12.0, 2.0, 3.0]), 2.0);
    assert_eq!(rem(&[17.0, 5.0]), 2.0);
    assert_eq!(min(&[4.0, -1.0, 3.0]), -1.0);
    assert_eq!(max(&[4.0, -1.0, 3.0]), 4.0);
    assert_eq!(sub(&[7.0]), 7.0);
  }

  #[test]
  fn comparisons_chain() {
    assert_eq!(ltn(&[1.0, 2.0, 3.0]), 1.0);
    assert_eq!(ltn(&[1.0, 3.0, 2.0]), 0.0);
    assert_eq!(eql(&[2.0, 2.0]), 1.0);
    assert_eq!(gtn(&[3.0, 2.0, 2.0]), 0.0);
    assert_eq!(eql(&[f64::NAN, f64::NAN]), 0.0);
  }

  #[test]
  fn nan_propagates_through_arithmetic() {
    assert!(add(&[1.0, f64::NAN]).is_nan());
    assert!(div(&[f64::NAN, 2.0]).is_nan());
  }
}
