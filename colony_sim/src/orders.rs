use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::planet::Planet;

/// Kinds of standing order a colony can carry. Each one demands a minimum
/// share of the budget for a single category until its goal is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Shield,
    Bases,
    Soil,
    Atmosphere,
    Terraform,
    Population,
    Factories,
}

impl OrderKind {
    pub const ALL: [OrderKind; 7] = [
        OrderKind::Shield,
        OrderKind::Bases,
        OrderKind::Soil,
        OrderKind::Atmosphere,
        OrderKind::Terraform,
        OrderKind::Population,
        OrderKind::Factories,
    ];

    pub const fn category(self) -> Category {
        match self {
            OrderKind::Shield | OrderKind::Bases => Category::Defense,
            OrderKind::Soil
            | OrderKind::Atmosphere
            | OrderKind::Terraform
            | OrderKind::Population => Category::Ecology,
            OrderKind::Factories => Category::Industry,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderKind::Shield => "shield",
            OrderKind::Bases => "bases",
            OrderKind::Soil => "soil",
            OrderKind::Atmosphere => "atmosphere",
            OrderKind::Terraform => "terraform",
            OrderKind::Population => "population",
            OrderKind::Factories => "factories",
        }
    }

    /// Whether the order makes sense for the planet at all.
    pub fn is_compatible(self, planet: &Planet) -> bool {
        match self {
            OrderKind::Soil => !planet.environment.is_hostile(),
            OrderKind::Atmosphere => planet.environment.is_hostile(),
            OrderKind::Shield => !planet.in_nebula,
            OrderKind::Bases
            | OrderKind::Terraform
            | OrderKind::Population
            | OrderKind::Factories => true,
        }
    }
}

/// Standing orders of one colony, keyed by kind. Amounts are budget fractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingOrders {
    orders: BTreeMap<OrderKind, f32>,
}

impl StandingOrders {
    /// Records `amount`, keeping the larger demand if the kind is already present.
    pub fn add(&mut self, kind: OrderKind, amount: f32) {
        let amount = amount.clamp(0.0, 1.0);
        if amount <= 0.0 {
            return;
        }
        let entry = self.orders.entry(kind).or_insert(0.0);
        *entry = entry.max(amount);
    }

    pub fn remove(&mut self, kind: OrderKind) -> Option<f32> {
        self.orders.remove(&kind)
    }

    pub fn clear_category(&mut self, category: Category) {
        self.orders.retain(|kind, _| kind.category() != category);
    }

    pub fn get(&self, kind: OrderKind) -> Option<f32> {
        self.orders.get(&kind).copied()
    }

    pub fn has(&self, kind: OrderKind) -> bool {
        self.orders.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OrderKind, f32)> + '_ {
        self.orders.iter().map(|(kind, amount)| (*kind, *amount))
    }

    /// Budget fraction demanded for `category`. When `priority` is set, every
    /// other order kind contributes nothing.
    pub fn amount_ordered(&self, category: Category, priority: Option<OrderKind>) -> f32 {
        self.iter()
            .filter(|(kind, _)| kind.category() == category)
            .filter(|(kind, _)| priority.map_or(true, |p| p == *kind))
            .map(|(_, amount)| amount)
            .sum::<f32>()
            .min(1.0)
    }

    /// Scale factor applied to every category's order so that their sum never
    /// exceeds the whole budget.
    pub fn order_adjustment(&self, priority: Option<OrderKind>) -> f32 {
        let total: f32 = Category::ALL
            .iter()
            .map(|category| self.amount_ordered(*category, priority))
            .sum();
        if total > 1.0 {
            1.0 / total
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::{Environment, PlanetId};

    #[test]
    fn incompatible_orders_are_detected() {
        let mut planet = Planet::new(PlanetId(3), "Rigel", (0.0, 0.0), Environment::Hostile, 40.0);
        assert!(!OrderKind::Soil.is_compatible(&planet));
        assert!(OrderKind::Atmosphere.is_compatible(&planet));
        planet.in_nebula = true;
        assert!(!OrderKind::Shield.is_compatible(&planet));
        assert!(OrderKind::Bases.is_compatible(&planet));
    }

    #[test]
    fn add_keeps_larger_demand() {
        let mut orders = StandingOrders::default();
        orders.add(OrderKind::Factories, 0.4);
        orders.add(OrderKind::Factories, 0.2);
        assert_eq!(orders.get(OrderKind::Factories), Some(0.4));
    }

    #[test]
    fn priority_silences_other_kinds() {
        let mut orders = StandingOrders::default();
        orders.add(OrderKind::Soil, 0.3);
        orders.add(OrderKind::Shield, 0.2);
        assert_eq!(orders.amount_ordered(Category::Ecology, None), 0.3);
        assert_eq!(
            orders.amount_ordered(Category::Ecology, Some(OrderKind::Shield)),
            0.0
        );
        assert_eq!(
            orders.amount_ordered(Category::Defense, Some(OrderKind::Shield)),
            0.2
        );
    }

    #[test]
    fn adjustment_scales_oversubscribed_orders() {
        let mut orders = StandingOrders::default();
        orders.add(OrderKind::Factories, 0.8);
        orders.add(OrderKind::Soil, 0.6);
        orders.add(OrderKind::Bases, 0.6);
        let adjustment = orders.order_adjustment(None);
        assert!((adjustment - 1.0 / 2.0).abs() < 1e-6);

        let mut modest = StandingOrders::default();
        modest.add(OrderKind::Bases, 0.25);
        assert_eq!(modest.order_adjustment(None), 1.0);
    }
}
