use std::{collections::BTreeMap, fmt};

use crate::schema::CartIngredient;

/*
Shopping list text format, one line per (ingredient, unit):

name, unit - total
salt, g - 7
*/

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    totals: BTreeMap<(String, String), i64>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn total(&self, name: &str, measurement_unit: &str) -> Option<i64> {
        self.totals
            .get(&(name.to_string(), measurement_unit.to_string()))
            .copied()
    }
}

impl From<Vec<CartIngredient>> for ShoppingList {
    fn from(value: Vec<CartIngredient>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

        for part in value {
            *totals
                .entry((part.name, part.measurement_unit))
                .or_insert(0) += i64::from(part.amount);
        }

        Self { totals }
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ((name, unit), total) in &self.totals {
            writeln!(f, "{name}, {unit} - {total}")?;
        }

        Ok(())
    }
}
