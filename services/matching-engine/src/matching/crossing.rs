//! Crossing detection logic
//!
//! Determines when a bid and ask are mutually profitable

use types::numeric::Price;
use types::order::Side;

/// Check if a bid and ask can match at given prices
///
/// For a buy order to match with a sell order the buy price must be
/// at least the sell price. An infinite bid crosses everything.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if an order on `side` at `price` crosses a counter-order at `counter_price`
pub fn incoming_can_match(side: Side, price: Price, counter_price: Price) -> bool {
    match side {
        Side::BUY => can_match(price, counter_price),
        Side::SELL => can_match(counter_price, price),
    }
}
