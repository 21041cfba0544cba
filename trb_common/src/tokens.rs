use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Tokens        ----------------------------------------------------------
/// A quantity of generation credits. One token buys one unit of work on the platform; balances and
/// package sizes are always whole tokens.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Tokens(i64);

op!(binary Tokens, Add, add);
op!(binary Tokens, Sub, sub);
op!(inplace Tokens, SubAssign, sub_assign);
op!(unary Tokens, Neg, neg);

impl Mul<i64> for Tokens {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Tokens {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a token quantity: {0}")]
pub struct TokensConversionError(String);

impl From<i64> for Tokens {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Tokens {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Tokens {}

impl TryFrom<u64> for Tokens {
    type Error = TokensConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(TokensConversionError(format!("Value {} is too large to convert to Tokens", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} tok", self.0)
    }
}

impl Tokens {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The post-refund balance after revoking `amount`, clamped so that it never goes negative.
    pub fn saturating_debit(self, amount: Tokens) -> Tokens {
        Tokens(self.0.saturating_sub(amount.0).max(0))
    }
}
