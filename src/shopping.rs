use std::collections::BTreeMap;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredient totals of a shopping cart, grouped by `(name, unit)` and kept in
/// ascending name-then-unit order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShoppingList {
    totals: BTreeMap<(String, String), i64>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, measurement_unit: &str, amount: i64) {
        *self
            .totals
            .entry((name.to_owned(), measurement_unit.to_owned()))
            .or_insert(0) += amount;
    }

    pub fn from_parts<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, i64)>,
    {
        let mut list = Self::new();
        for (name, unit, amount) in parts {
            list.add(name, unit, amount);
        }
        list
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn lines(&self) -> Vec<ShoppingLine> {
        self.totals
            .iter()
            .map(|((name, unit), amount)| ShoppingLine {
                name: name.to_owned(),
                measurement_unit: unit.to_owned(),
                amount: *amount,
            })
            .collect()
    }

    /// Plain text download: the header, then `"{name} - {amount}, {unit}"` per line.
    pub fn render(&self) -> String {
        let mut s = String::from(SHOPPING_LIST_HEADER);
        s.push('\n');

        for ((name, unit), amount) in self.totals.iter() {
            s += &format!("{name} - {amount}, {unit}\n");
        }

        s
    }
}
