use partix_core::error::{Error, Result};

use super::InlinedAggregation;

/// Min or max of nullable integers: `sign == -1` selects the minimum,
/// `sign == +1` the maximum. Nulls are skipped; no values -> `None`.
#[derive(Debug, Clone, Copy)]
pub struct NullableMinMax {
    sign: i32,
}

impl NullableMinMax {
    pub fn new(sign: i32) -> Result<Self> {
        match sign {
            -1 | 1 => Ok(Self { sign }),
            other => Err(Error::InvalidArgument(format!(
                "min/max sign must be -1 or +1, got {other}"
            ))),
        }
    }

    pub fn min() -> Self {
        Self { sign: -1 }
    }

    pub fn max() -> Self {
        Self { sign: 1 }
    }

    pub fn sign(&self) -> i32 {
        self.sign
    }

    fn pick(&self, current: Option<i64>, candidate: Option<i64>) -> Option<i64> {
        match (current, candidate) {
            (None, c) => c,
            (c, None) => c,
            (Some(a), Some(b)) => {
                let replace = if self.sign < 0 { b < a } else { b > a };
                Some(if replace { b } else { a })
            }
        }
    }
}

impl InlinedAggregation for NullableMinMax {
    type Element = Option<i64>;
    type Accumulator = Option<i64>;
    type Output = Option<i64>;

    fn name(&self) -> &'static str {
        if self.sign < 0 {
            "min"
        } else {
            "max"
        }
    }

    fn init(&self) -> Option<i64> {
        None
    }

    fn fold(&self, acc: Option<i64>, element: Option<i64>) -> Result<Option<i64>> {
        Ok(self.pick(acc, element))
    }

    fn combine(&self, left: Option<i64>, right: Option<i64>) -> Result<Option<i64>> {
        Ok(self.pick(left, right))
    }

    fn finish(&self, acc: Option<i64>) -> Result<Option<i64>> {
        Ok(acc)
    }
}
