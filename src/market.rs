//! Market quantities exchanged between a region and the outer equilibrium solver.
//!
//! Prices are set from outside (by the solver, or from input data) and read by technologies when
//! calculating their costs. Supplies and demands are calculated by the region and read back by the
//! solver.
use crate::id::define_id_type;
use indexmap::IndexMap;

define_id_type! {GoodID}

/// A combination of good and period
type MarketKey = (GoodID, usize);

/// A map of a market quantity (price, supply or demand) for each good and period
#[derive(Default, Debug, Clone, PartialEq)]
pub struct MarketQuantities(IndexMap<MarketKey, f64>);

impl MarketQuantities {
    /// Get the value for the given good and period, if there is one
    pub fn get(&self, good: &GoodID, period: usize) -> Option<f64> {
        self.0.get(&(good.clone(), period)).copied()
    }

    /// Set the value for the given good and period
    pub fn insert(&mut self, good: &GoodID, period: usize, value: f64) {
        self.0.insert((good.clone(), period), value);
    }

    /// Add to the value for the given good and period
    pub fn add(&mut self, good: &GoodID, period: usize, value: f64) {
        *self.0.entry((good.clone(), period)).or_insert(0.0) += value;
    }

    /// Remove all values for the given period
    pub fn clear_period(&mut self, period: usize) {
        self.0.retain(|(_, p), _| *p != period);
    }

    /// Iterate over the goods and values for the given period
    pub fn iter_period(&self, period: usize) -> impl Iterator<Item = (&GoodID, f64)> {
        self.0
            .iter()
            .filter(move |((_, p), _)| *p == period)
            .map(|((good, _), value)| (good, *value))
    }
}

/// The prices, supplies and demands of goods in one region
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Market {
    /// Market prices, as set by the solver
    pub prices: MarketQuantities,
    /// Quantities supplied by the region's sectors
    pub supplies: MarketQuantities,
    /// Quantities demanded, both final demand and demand from other sectors
    pub demands: MarketQuantities,
}

impl Market {
    /// Reset the calculated supplies and demands for a period
    pub fn clear_period(&mut self, period: usize) {
        self.supplies.clear_period(period);
        self.demands.clear_period(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_quantities() {
        let elc = GoodID::new("electricity");
        let gas = GoodID::new("gas");
        let mut quantities = MarketQuantities::default();
        quantities.insert(&elc, 0, 2.0);
        quantities.add(&elc, 0, 3.0);
        quantities.add(&gas, 0, 1.0);
        quantities.add(&gas, 1, 4.0);

        assert_eq!(quantities.get(&elc, 0), Some(5.0));
        assert_eq!(quantities.get(&elc, 1), None);
        assert_eq!(quantities.iter_period(0).count(), 2);

        quantities.clear_period(0);
        assert_eq!(quantities.get(&gas, 0), None);
        assert_eq!(quantities.get(&gas, 1), Some(4.0));
    }

    #[test]
    fn test_market_clear_period_keeps_prices() {
        let good = GoodID::new("gas");
        let mut market = Market::default();
        market.prices.insert(&good, 0, 3.5);
        market.demands.insert(&good, 0, 10.0);
        market.clear_period(0);
        assert_eq!(market.prices.get(&good, 0), Some(3.5));
        assert_eq!(market.demands.get(&good, 0), None);
    }
}
