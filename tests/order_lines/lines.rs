//! Order line entity with a two-part key.

use serde::{Deserialize, Serialize};
use universal_context::Entity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[entity(set = "OrderLines")]
pub struct OrderLine {
    #[entity(key)]
    pub order_id: String,
    #[entity(key)]
    pub line_no: u32,
    pub sku: String,
    pub quantity: u32,
    pub note: Option<String>,
    #[serde(skip)]
    #[entity(skip)]
    pub picked: bool,
}

impl OrderLine {
    pub fn new(order_id: &str, line_no: u32, sku: &str, quantity: u32) -> Self {
        Self {
            order_id: order_id.to_string(),
            line_no,
            sku: sku.to_string(),
            quantity,
            note: None,
            picked: false,
        }
    }
}
