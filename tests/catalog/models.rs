//! Catalog entities used by the context tests.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use universal_context::Entity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
#[serde(rename_all = "PascalCase")]
#[entity(set = "Products")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub discontinued: bool,
    pub category: Option<Category>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Category {
    pub name: String,
}

impl Product {
    pub fn new(id: i64, name: &str, price: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            price,
            discontinued: false,
            category: None,
        }
    }

    pub fn in_category(mut self, category: &str) -> Self {
        self.category = Some(Category {
            name: category.to_string(),
        });
        self
    }
}

/// Customers are located by e-mail in some tests, which is not their key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub name: String,
}

pub fn product_record(id: i64, name: &str, price: f64) -> Value {
    json!({
        "Id": id,
        "Name": name,
        "Price": price,
        "Discontinued": false,
        "Category": null,
    })
}
