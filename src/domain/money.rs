use bigdecimal::{BigDecimal, RoundingMode};

/// Cents. Every computed amount is rendered with exactly this many places.
pub const MONEY_SCALE: i64 = 2;

/// Fixes an amount to two decimal places so "20.00" × 1 still reads "20.00".
pub fn to_money(amount: BigDecimal) -> BigDecimal {
    amount.with_scale_round(MONEY_SCALE, RoundingMode::HalfEven)
}

/// Sum of `price × quantity` over `lines`, at money scale.
pub fn line_sum<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (&'a BigDecimal, u32)>,
{
    let sum = lines
        .into_iter()
        .fold(BigDecimal::from(0), |acc, (price, quantity)| {
            acc + price * &BigDecimal::from(quantity)
        });
    to_money(sum)
}
