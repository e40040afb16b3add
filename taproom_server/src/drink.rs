//! The drinks catalog and its in-memory store

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One ingredient line of a drink recipe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// The ingredient name, omitted from the public short view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The display color of this portion of the drink
    pub color: String,
    /// How many parts of the drink this ingredient makes up
    pub parts: u32,
}

/// The short, public view of an ingredient: color and proportion only
#[derive(Clone, Debug, Serialize)]
pub struct IngredientSummary {
    /// The display color of this portion of the drink
    pub color: String,
    /// How many parts of the drink this ingredient makes up
    pub parts: u32,
}

/// A drink in the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Drink {
    /// The store-assigned identifier
    pub id: i64,
    /// The drink's display title, unique within the catalog
    pub title: String,
    /// The full recipe, including ingredient names
    pub recipe: Vec<Ingredient>,
}

/// The short, public view of a drink
#[derive(Clone, Debug, Serialize)]
pub struct DrinkSummary {
    /// The store-assigned identifier
    pub id: i64,
    /// The drink's display title
    pub title: String,
    /// The recipe with ingredient names stripped
    pub recipe: Vec<IngredientSummary>,
}

impl Drink {
    /// The public view of this drink, with ingredient names stripped
    pub fn summary(&self) -> DrinkSummary {
        DrinkSummary {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| IngredientSummary {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    drinks: Vec<Drink>,
    next_id: i64,
}

/// A shared, in-memory drinks catalog
#[derive(Clone, Debug)]
#[must_use]
pub struct DrinkStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl Default for DrinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DrinkStore {
    /// An empty catalog
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                drinks: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// A catalog pre-populated with the house menu
    pub fn seeded() -> Self {
        let drinks = vec![
            Drink {
                id: 1,
                title: "Water".to_owned(),
                recipe: vec![ingredient("water", "blue", 1)],
            },
            Drink {
                id: 2,
                title: "Matcha Shake".to_owned(),
                recipe: vec![
                    ingredient("milk", "grey", 3),
                    ingredient("matcha", "green", 1),
                ],
            },
            Drink {
                id: 3,
                title: "Flatwhite".to_owned(),
                recipe: vec![
                    ingredient("milk", "grey", 3),
                    ingredient("coffee", "brown", 1),
                ],
            },
        ];

        Self {
            inner: Arc::new(RwLock::new(StoreInner { drinks, next_id: 4 })),
        }
    }

    /// Lists every drink in the catalog
    pub async fn list(&self) -> Vec<Drink> {
        self.inner.read().await.drinks.clone()
    }

    /// Adds a drink, assigning it the next identifier
    ///
    /// Titles are unique, compared case-insensitively. Returns `None` if a
    /// drink with the same title already exists.
    pub async fn create(&self, title: String, recipe: Vec<Ingredient>) -> Option<Drink> {
        let mut inner = self.inner.write().await;

        if inner
            .drinks
            .iter()
            .any(|d| d.title.eq_ignore_ascii_case(&title))
        {
            return None;
        }

        let drink = Drink {
            id: inner.next_id,
            title,
            recipe,
        };
        inner.next_id += 1;
        inner.drinks.push(drink.clone());
        Some(drink)
    }

    /// Applies a partial update to the drink with the given identifier
    ///
    /// Returns `None` if no such drink exists.
    pub async fn update(
        &self,
        id: i64,
        title: Option<String>,
        recipe: Option<Vec<Ingredient>>,
    ) -> Option<Drink> {
        let mut inner = self.inner.write().await;
        let drink = inner.drinks.iter_mut().find(|d| d.id == id)?;

        if let Some(title) = title {
            drink.title = title;
        }
        if let Some(recipe) = recipe {
            drink.recipe = recipe;
        }

        Some(drink.clone())
    }

    /// Removes the drink with the given identifier
    ///
    /// Returns `None` if no such drink exists.
    pub async fn delete(&self, id: i64) -> Option<i64> {
        let mut inner = self.inner.write().await;
        let position = inner.drinks.iter().position(|d| d.id == id)?;
        inner.drinks.remove(position);
        Some(id)
    }
}

fn ingredient(name: &str, color: &str, parts: u32) -> Ingredient {
    Ingredient {
        name: Some(name.to_owned()),
        color: color.to_owned(),
        parts,
    }
}
