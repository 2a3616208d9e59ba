use crate::dto::ObtainedProductDto;

/// Domain rules about orders that do not need the store.
pub struct OrderService;

impl OrderService {
    /// Sum of price × quantity over the positions, in cents.
    pub fn total(products: &[ObtainedProductDto]) -> i64 {
        products
            .iter()
            .map(|p| p.price * i64::from(p.quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(price: i64, quantity: i16) -> ObtainedProductDto {
        ObtainedProductDto {
            id: 1,
            price,
            weight: 1,
            quantity,
        }
    }

    #[test]
    fn test_total_weights_price_by_quantity() {
        let products = vec![position(1_000, 2), position(250, 3)];
        assert_eq!(OrderService::total(&products), 2_750);
    }

    #[test]
    fn test_total_of_nothing_is_zero() {
        assert_eq!(OrderService::total(&[]), 0);
    }
}
