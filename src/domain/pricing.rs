//! Pricing rules
//!
//! Pure arithmetic over integer minor currency units. Callers validate that
//! inputs are non-negative.

/// Subtotal at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 80_000;

/// Flat shipping cost charged below the free-shipping threshold.
pub const BASE_SHIPPING_COST: i64 = 20_000;

/// Shipping actually charged for a given subtotal.
pub fn compute_shipping(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        BASE_SHIPPING_COST
    }
}

/// Savings shown to the customer: the shipping they would have paid had the
/// free-shipping threshold not been met.
pub fn compute_savings(subtotal: i64, shipping: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD && shipping == 0 {
        BASE_SHIPPING_COST
    } else {
        0
    }
}

/// Order total. The savings line is the waived shipping, already reflected
/// in the discounted `shipping` amount, so it never reduces the total a
/// second time.
pub fn compute_total(subtotal: i64, shipping: i64, savings: i64) -> i64 {
    debug_assert!(shipping == 0 || savings == 0);
    subtotal + shipping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_threshold() {
        assert_eq!(compute_shipping(79_999), 20_000);
        assert_eq!(compute_shipping(80_000), 0);
        assert_eq!(compute_shipping(0), 20_000);
    }

    #[test]
    fn test_savings() {
        assert_eq!(compute_savings(80_000, 0), 20_000);
        assert_eq!(compute_savings(79_999, 20_000), 0);
    }

    #[test]
    fn test_total() {
        assert_eq!(compute_total(80_000, 0, 20_000), 80_000);
        assert_eq!(compute_total(50_000, 20_000, 0), 70_000);
    }
}
