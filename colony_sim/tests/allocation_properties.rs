//! Property tests for the allocation engine: budget bounds, lock stability
//! and validation idempotence under arbitrary call sequences.

use proptest::prelude::*;

use colony_sim::{
    Allocation, Category, Colony, ColonyId, EmpireId, Environment, OrderKind, Planet, PlanetId,
    DEFAULT_BUDGET,
};

#[derive(Debug, Clone)]
enum Op {
    Increment(Category, i32),
    Realign(Category),
    Cleanup(Category),
    Order(OrderKind, f32),
    Lock(Category),
    Unlock(Category),
    Force(Category, i32),
    Raise(Category, i32),
}

fn category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn order_kind() -> impl Strategy<Value = OrderKind> {
    prop::sample::select(OrderKind::ALL.to_vec())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (category(), -120i32..120).prop_map(|(category, amount)| Op::Increment(category, amount)),
        category().prop_map(Op::Realign),
        category().prop_map(Op::Cleanup),
        (order_kind(), 0.0f32..1.0).prop_map(|(kind, amount)| Op::Order(kind, amount)),
        category().prop_map(Op::Lock),
        category().prop_map(Op::Unlock),
        (category(), -20i32..140).prop_map(|(category, ticks)| Op::Force(category, ticks)),
        (category(), 0i32..140).prop_map(|(category, ticks)| Op::Raise(category, ticks)),
    ]
}

fn colony() -> Colony {
    Colony::new(ColonyId(0), EmpireId(0), PlanetId(0), 20.0, DEFAULT_BUDGET)
}

fn planet() -> Planet {
    Planet::new(PlanetId(0), "Testbed", (0.0, 0.0), Environment::Average, 60.0)
}

fn within_budget(colony: &Colony) -> Result<(), TestCaseError> {
    let ticks = colony.allocation.ticks();
    prop_assert!(
        ticks.iter().all(|value| (0..=DEFAULT_BUDGET).contains(value)),
        "out of range: {:?}",
        ticks
    );
    prop_assert!(
        colony.allocation.total() <= DEFAULT_BUDGET,
        "over budget: {:?}",
        ticks
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn allocation_stays_within_budget(ops in prop::collection::vec(op(), 1..60)) {
        let planet = planet();
        let mut colony = colony();
        for op in ops {
            match op {
                Op::Increment(category, amount) => {
                    colony.increment(category, amount);
                }
                Op::Realign(category) => colony.realign_spending(category),
                Op::Cleanup(category) => colony.cleanup_spending(category),
                Op::Order(kind, amount) => {
                    colony.add_colony_order(kind, amount, &planet);
                    colony.apply_orders(None);
                }
                Op::Lock(category) => colony.lock(category),
                Op::Unlock(category) => colony.unlock(category),
                Op::Force(category, ticks) => colony.force_pct(category, ticks),
                Op::Raise(category, ticks) => {
                    colony.set_allocation(category, ticks);
                }
            }
            within_budget(&colony)?;
        }
    }

    #[test]
    fn locked_category_survives_rebalancing(
        ticks in prop::array::uniform5(0i32..=100),
        locked in category(),
        target in category(),
        cleanup in any::<bool>(),
    ) {
        prop_assume!(locked != target);
        let mut colony = colony();
        colony.allocation = Allocation::from_ticks(DEFAULT_BUDGET, ticks);
        colony.lock(locked);
        let before = colony.allocation[locked];
        if cleanup {
            colony.cleanup_spending(target);
        } else {
            colony.realign_spending(target);
        }
        prop_assert_eq!(colony.allocation[locked], before);
    }

    #[test]
    fn validate_is_idempotent(ticks in prop::array::uniform5(-50i32..200)) {
        let mut once = Allocation::from_ticks(DEFAULT_BUDGET, ticks);
        once.validate();
        let mut twice = once.clone();
        twice.validate();
        prop_assert_eq!(once.ticks(), twice.ticks());
        prop_assert!(once.check().is_ok());
    }
}
