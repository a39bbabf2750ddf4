use rust_decimal::Decimal;

/// Round a monetary amount to 2 decimal places.
///
/// Applied only at computation boundaries; intermediate sums stay unrounded
/// so repeated rounding cannot drift totals.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}
