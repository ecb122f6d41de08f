//! Namespace price function

use serde::{Deserialize, Serialize};

use crate::constants::PRICE_BUCKETS;
use crate::{ClarityValue, Error, Result};

/// Price function of a namespace: 16 length buckets, base, coefficient and
/// the two discounts for names with non-alpha characters or without vowels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceFunction {
    pub buckets: [u128; PRICE_BUCKETS],
    pub base: u128,
    pub coeff: u128,
    pub nonalpha_discount: u128,
    pub no_vowel_discount: u128,
}

impl PriceFunction {
    /// Contract argument / response tuple
    pub fn to_clarity(&self) -> ClarityValue {
        ClarityValue::tuple([
            (
                "buckets",
                ClarityValue::list(self.buckets.iter().map(|b| ClarityValue::uint(*b))),
            ),
            ("base", ClarityValue::uint(self.base)),
            ("coeff", ClarityValue::uint(self.coeff)),
            ("nonalpha-discount", ClarityValue::uint(self.nonalpha_discount)),
            ("no-vowel-discount", ClarityValue::uint(self.no_vowel_discount)),
        ])
    }

    pub fn from_clarity(value: ClarityValue) -> Result<Self> {
        let mut tuple = value.expect_tuple()?;

        let items = tuple.take("buckets")?.expect_list()?;
        if items.len() != PRICE_BUCKETS {
            return Err(Error::unexpected(format!(
                "price function has {} buckets, expected {}",
                items.len(),
                PRICE_BUCKETS
            ))
            .with_response_type("list"));
        }
        let mut buckets = [0u128; PRICE_BUCKETS];
        for (slot, item) in buckets.iter_mut().zip(items) {
            *slot = item.expect_uint()?;
        }

        Ok(Self {
            buckets,
            base: tuple.take("base")?.expect_uint()?,
            coeff: tuple.take("coeff")?.expect_uint()?,
            nonalpha_discount: tuple.take("nonalpha-discount")?.expect_uint()?,
            no_vowel_discount: tuple.take("no-vowel-discount")?.expect_uint()?,
        })
    }
}
