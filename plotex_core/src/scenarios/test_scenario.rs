//! A small cave-and-cyclops scenario: pick up a sword and a lamp, use
//! the lamp to go underground, and either feed the cyclops (by way of
//! the kitchen) or feed the orc directly. Exercises every clause a test
//! can make, against a scenario small enough to read in one sitting.

use crate::{
    action::{Action, Chain, Has, Lose, Set},
    scenario::{Scenario, ScenarioBuilder},
    state::State,
    test_runner::Test,
    value::{QualityValue, intern_key},
};

/// Assemble the scenario. Panics if the actions' schema fragments
/// conflict with each other — a programming error in this module, not
/// something a caller needs to recover from.
#[must_use]
pub fn build() -> Scenario {
    let sword = intern_key("sword");
    let lamp = intern_key("lamp");
    let underground = intern_key("underground");
    let food = intern_key("food");
    let kitchen = intern_key("kitchen");
    let pants = intern_key("pants");
    let wand = intern_key("wand");

    ScenarioBuilder::new()
        .state("Start", State::new([(food.clone(), QualityValue::Bool(true))]))
        .action("FindSword", Action::from(Set::new(sword.clone(), QualityValue::Bool(true))))
        .action("FindLamp", Action::from(Set::new(lamp.clone(), QualityValue::Bool(true))))
        .action(
            "EnterCave",
            Action::from(Chain::new(vec![
                Action::from(Has::new(lamp.clone(), QualityValue::Bool(true))),
                Action::from(Set::new(underground.clone(), QualityValue::Bool(true))),
            ])),
        )
        .action(
            "FeedCyclops",
            Action::from(Chain::new(vec![
                Action::from(Has::new(underground.clone(), QualityValue::Bool(true))),
                Action::from(Lose::new(food.clone(), crate::schema::ValueType::Bool)),
                Action::from(Set::new(kitchen.clone(), QualityValue::Bool(true))),
            ])),
        )
        .action(
            "FeedOrc",
            Action::from(Chain::new(vec![
                Action::from(Lose::new(food.clone(), crate::schema::ValueType::Bool)),
                Action::from(Set::new(pants.clone(), QualityValue::Bool(true))),
            ])),
        )
        .action(
            "KitchenCook",
            Action::from(Chain::new(vec![
                Action::from(Has::new(kitchen.clone(), QualityValue::Bool(true))),
                Action::from(Set::new(food.clone(), QualityValue::Bool(true))),
            ])),
        )
        .action("FeedSelf", Action::from(Lose::new(food.clone(), crate::schema::ValueType::Bool)))
        .test(
            "Test1",
            Test::new()
                .start(State::new([(food.clone(), QualityValue::Bool(true))]))
                .gets(pants.clone()),
        )
        .test("Test2", Test::new().can(Action::from(Has::new(pants.clone(), QualityValue::Bool(true)))))
        .test("Test3", Test::new().cannot(Action::from(Has::new(wand, QualityValue::Bool(true)))))
        .test(
            "Test4",
            Test::new().block("KitchenCook").cannot(Action::from(Chain::new(vec![
                Action::from(Has::new(pants.clone(), QualityValue::Bool(true))),
                Action::from(Has::new(kitchen.clone(), QualityValue::Bool(true))),
            ]))),
        )
        .test("Test5", Test::new().start(State::empty()).gets_not(pants))
        .test("Test6", Test::new().includes("KitchenCook"))
        .test("Test7", Test::new().block("FeedCyclops").excludes("KitchenCook"))
        .build()
        .expect("the cave-and-cyclops scenario's own fragments never conflict")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_every_quality() {
        let scenario = build();
        for key in ["sword", "lamp", "underground", "food", "kitchen", "pants", "wand"] {
            assert!(scenario.schema().contains(&intern_key(key)), "missing {key}");
        }
    }

    #[test]
    fn every_named_test_is_present() {
        let scenario = build();
        for name in ["Test1", "Test2", "Test3", "Test4", "Test5", "Test6", "Test7"] {
            assert!(scenario.test(name).is_ok(), "missing {name}");
        }
    }
}
