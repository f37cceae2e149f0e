//! Integration tests for name- and type-addressed CRUD over a catalog.

mod models;

use models::{product_record, Customer, Product};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use universal_context::{
    copy_fields, ChangeState, ContextBuilder, ContextError, ContextOptions, FilterError,
    InMemoryStore, Store, UniversalContext,
};

fn context() -> UniversalContext<InMemoryStore> {
    ContextBuilder::new()
        .register::<Product>()
        .register::<Customer>()
        .build(InMemoryStore::new())
}

fn seeded() -> UniversalContext<InMemoryStore> {
    let mut ctx = context();
    {
        let mut products = ctx.entities_of::<Product>().unwrap();
        products.add(Product::new(1, "Desk Lamp", 4.5).in_category("Lighting")).unwrap();
        products.add(Product::new(2, "Floor Lamp", 12.0).in_category("Lighting")).unwrap();
        products.add(Product::new(3, "Desk", 80.0)).unwrap();
        products.add(Product::new(4, "Chair", 45.0)).unwrap();
        products.add(Product::new(5, "Lampshade", 3.25)).unwrap();
    }
    ctx.save_changes().unwrap();
    ctx
}

fn ids(records: &[Value]) -> Vec<i64> {
    records.iter().map(|r| r["Id"].as_i64().unwrap()).collect()
}

#[test]
fn add_by_name_then_save() {
    let mut ctx = context();

    let added = ctx
        .entities("Products")
        .unwrap()
        .add(json!({ "Id": 1, "Name": "Desk Lamp", "Price": 4, "Discontinued": false, "Category": null }))
        .unwrap();
    // The record comes back in the shape of the registered type.
    assert_eq!(added["Price"], json!(4.0));

    // Visible to find before saving, not to the store.
    assert!(ctx.find("Products", &[json!(1)]).unwrap().is_some());
    assert_eq!(ctx.store().len("Products").unwrap(), 0);

    assert_eq!(ctx.save_changes().unwrap(), 1);
    assert_eq!(ctx.store().len("Products").unwrap(), 1);
    assert!(ctx.pending_changes().is_empty());

    let found = ctx.entities_of::<Product>().unwrap().find(&[json!(1)]).unwrap();
    assert_eq!(found, Some(Product::new(1, "Desk Lamp", 4.0)));
}

#[test]
fn add_rejects_records_that_do_not_fit() {
    let mut ctx = context();
    let err = ctx
        .entities("Products")
        .unwrap()
        .add(json!({ "Id": 1, "Name": "Desk Lamp", "Price": "cheap" }))
        .unwrap_err();
    assert!(matches!(err, ContextError::Conversion(_)));
    assert!(ctx.pending_changes().is_empty());
}

#[test]
fn unknown_set_is_not_found() {
    let mut ctx = context();
    let err = ctx.entities("Widgets").err().unwrap();
    assert!(matches!(err, ContextError::SetNotFound(ref name) if name == "Widgets"));

    // Names are exact unless configured otherwise.
    assert!(ctx.entities("products").is_err());
}

#[test]
fn set_names_can_ignore_case() {
    let mut ctx = ContextBuilder::new()
        .register::<Product>()
        .options(ContextOptions::new().ignore_set_case(true))
        .build(InMemoryStore::new());

    ctx.entities("PRODUCTS")
        .unwrap()
        .add(product_record(9, "Stool", 20.0))
        .unwrap();
    assert_eq!(ctx.save_changes().unwrap(), 1);
}

#[test]
fn get_is_strict() {
    let mut ctx = seeded();
    let products = ctx.entities("Products").unwrap();

    let one = products.get("Id == 3").unwrap().unwrap();
    assert_eq!(one["Name"], "Desk");

    assert_eq!(products.get("Price > 1000").unwrap(), None);

    let err = products.get("Name.Contains(\"Lamp\")").unwrap_err();
    assert!(matches!(err, ContextError::Cardinality { found: 3, .. }));
}

#[test]
fn typed_get_with_predicate() {
    let mut ctx = seeded();
    let products = ctx.entities_of::<Product>().unwrap();

    let chair = products.get(|p| p.name == "Chair").unwrap().unwrap();
    assert_eq!(chair.id, 4);
    assert!(products.get(|p| p.price > 1000.0).unwrap().is_none());
    assert!(matches!(
        products.get(|p| p.price < 20.0),
        Err(ContextError::Cardinality { found: 3, .. })
    ));

    let desk = products.get_by("Name == 'Desk'").unwrap().unwrap();
    assert_eq!(desk.price, 80.0);
}

#[test]
fn update_changes_only_non_key_fields() {
    let mut ctx = seeded();

    let updated = ctx
        .entities("Products")
        .unwrap()
        .update_by_keys(&json!({ "Id": 1, "Price": 9.99 }), &["Id"])
        .unwrap();
    assert_eq!(updated["Id"], 1);
    assert_eq!(updated["Price"], 9.99);
    assert_eq!(updated["Name"], "Desk Lamp");
    ctx.save_changes().unwrap();

    let stored = ctx.find("Products", &[json!(1)]).unwrap().unwrap();
    assert_eq!(stored["Price"], 9.99);
    assert_eq!(stored["Name"], "Desk Lamp");

    // Other records are untouched.
    let other = ctx.find("Products", &[json!(2)]).unwrap().unwrap();
    assert_eq!(other["Price"], 12.0);
}

#[test]
fn update_target_never_takes_source_key() {
    let mut ctx = seeded();
    let mut products = ctx.entities("Products").unwrap();

    let target = products.find(&[json!(2)]).unwrap().unwrap();
    let updated = products
        .update(target, &json!({ "id": 99, "name": "Arc Lamp" }), &["id"])
        .unwrap();

    assert_eq!(updated["Id"], 2);
    assert_eq!(updated["Name"], "Arc Lamp");
    assert_eq!(ctx.pending_changes()[0].state, ChangeState::Modified);
}

#[test]
fn typed_update_replaces_whole_entity() {
    let mut ctx = seeded();
    {
        let mut products = ctx.entities_of::<Product>().unwrap();
        let mut chair = products.find(&[json!(4)]).unwrap().unwrap();
        chair.discontinued = true;
        products.update(chair).unwrap();
    }
    assert_eq!(ctx.pending_changes()[0].state, ChangeState::Modified);

    ctx.save_changes().unwrap();
    let discontinued = ctx.query("Products", "Discontinued").unwrap().count().unwrap();
    assert_eq!(discontinued, 1);
}

#[test]
fn update_from_json_document() {
    let mut ctx = seeded();

    let updated = ctx
        .entities_of::<Product>()
        .unwrap()
        .update_from_json(r#"{ "Id": "4", "Price": "49.5", "Discontinued": "true" }"#, &["Id"])
        .unwrap();
    assert_eq!(updated.price, 49.5);
    assert!(updated.discontinued);
    assert_eq!(updated.name, "Chair");

    ctx.save_changes().unwrap();
    let stored = ctx.find("Products", &[json!(4)]).unwrap().unwrap();
    assert_eq!(stored["Discontinued"], true);
}

#[test]
fn update_by_non_key_field() {
    let mut ctx = context();
    {
        let mut customers = ctx.entities_of::<Customer>().unwrap();
        for (id, email) in [(1, "ana@example.com"), (2, "bo@example.com"), (3, "bo@example.com")] {
            customers
                .add(Customer {
                    id,
                    email: email.to_string(),
                    name: format!("customer {}", id),
                })
                .unwrap();
        }
    }
    ctx.save_changes().unwrap();

    let mut customers = ctx.entities("Customers").unwrap();
    let updated = customers
        .update_from_json(r#"{ "Email": "ana@example.com", "Name": "Ana" }"#, &["Email"])
        .unwrap();
    assert_eq!(updated, json!({ "Id": 1, "Email": "ana@example.com", "Name": "Ana" }));

    let err = customers
        .update_from_json(r#"{ "Email": "cy@example.com", "Name": "Cy" }"#, &["Email"])
        .unwrap_err();
    assert!(matches!(err, ContextError::RecordNotFound { .. }));

    let err = customers
        .update_by_keys(&json!({ "Email": "bo@example.com", "Name": "Bo" }), &["Email"])
        .unwrap_err();
    assert!(matches!(err, ContextError::Cardinality { found: 2, .. }));
}

#[test]
fn update_located_by_non_key_field_cannot_move_the_key() {
    let mut ctx = context();
    {
        let mut customers = ctx.entities_of::<Customer>().unwrap();
        for (id, email, name) in [(1, "ana@example.com", "Ana"), (2, "bo@example.com", "Bo")] {
            customers
                .add(Customer {
                    id,
                    email: email.to_string(),
                    name: name.to_string(),
                })
                .unwrap();
        }
    }
    ctx.save_changes().unwrap();

    let err = ctx
        .entities("Customers")
        .unwrap()
        .update_by_keys(
            &json!({ "Email": "ana@example.com", "Id": 2, "Name": "Ana B" }),
            &["Email"],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ContextError::KeyChanged { ref from, ref to, .. } if from == "1" && to == "2"
    ));
    assert!(ctx.pending_changes().is_empty());
    assert_eq!(ctx.save_changes().unwrap(), 0);

    let ana = ctx.find("Customers", &[json!(1)]).unwrap().unwrap();
    let bo = ctx.find("Customers", &[json!(2)]).unwrap().unwrap();
    assert_eq!(ana, json!({ "Id": 1, "Email": "ana@example.com", "Name": "Ana" }));
    assert_eq!(bo, json!({ "Id": 2, "Email": "bo@example.com", "Name": "Bo" }));

    // Carrying the located record's own key is fine.
    let updated = ctx
        .entities("Customers")
        .unwrap()
        .update_from_json(r#"{ "Email": "ana@example.com", "Id": 1, "Name": "Ana B" }"#, &["Email"])
        .unwrap();
    assert_eq!(updated["Name"], "Ana B");
}

#[test]
fn update_without_key_names_cannot_move_the_key() {
    let mut ctx = seeded();
    let mut products = ctx.entities("Products").unwrap();

    let target = products.find(&[json!(1)]).unwrap().unwrap();
    let err = products
        .update(target, &json!({ "Id": 3, "Price": 1.0 }), &[])
        .unwrap_err();
    assert!(matches!(err, ContextError::KeyChanged { .. }));
    assert!(ctx.pending_changes().is_empty());

    let desk = ctx.find("Products", &[json!(3)]).unwrap().unwrap();
    assert_eq!(desk["Name"], "Desk");
    assert_eq!(desk["Price"], 80.0);
}

#[test]
fn update_errors_leave_changes_untouched() {
    let mut ctx = seeded();
    let mut products = ctx.entities("Products").unwrap();

    let err = products
        .update_by_keys(&json!({ "Id": 1, "Price": 2.0, "Colour": "red" }), &["Id"])
        .unwrap_err();
    assert!(matches!(err, ContextError::UnknownField { ref field, .. } if field == "Colour"));

    let err = products
        .update_by_keys(&json!({ "Price": 2.0 }), &["Id"])
        .unwrap_err();
    assert!(matches!(err, ContextError::MissingKeyValue { ref key } if key == "Id"));

    let err = products
        .update_by_keys(&json!({ "Id": 1 }), &["Sku"])
        .unwrap_err();
    assert!(matches!(err, ContextError::UnknownField { ref field, .. } if field == "Sku"));

    let err = products
        .update_by_keys(&json!({ "Id": 77, "Price": 1.0 }), &["Id"])
        .unwrap_err();
    assert!(matches!(err, ContextError::RecordNotFound { .. }));

    let err = products.update_from_json("{ not json", &["Id"]).unwrap_err();
    assert!(matches!(err, ContextError::Json(_)));

    let err = products.update_from_json("[1, 2]", &["Id"]).unwrap_err();
    assert!(matches!(err, ContextError::NotAnObject(_)));

    assert!(ctx.pending_changes().is_empty());
}

#[test]
fn copy_fields_is_not_atomic() {
    let mut product = Product::new(1, "Desk Lamp", 4.5);
    let source = json!({ "Name": "Reading Lamp", "Colour": "red", "Price": 1.0 });

    let err = copy_fields(&mut product, source.as_object().unwrap(), &["Id"]).unwrap_err();
    assert!(matches!(err, ContextError::UnknownField { .. }));

    // Fields before the failure were already copied; later ones were not.
    assert_eq!(product.name, "Reading Lamp");
    assert_eq!(product.price, 4.5);
}

#[test]
fn paged_get_all() {
    let mut ctx = seeded();
    let products = ctx.entities("Products").unwrap();

    assert_eq!(ids(&products.get_all("Price", 1, 2, false).unwrap()), vec![5, 1]);
    assert_eq!(ids(&products.get_all("Price", 2, 2, false).unwrap()), vec![2, 4]);
    assert_eq!(ids(&products.get_all("Price", 3, 2, false).unwrap()), vec![3]);
    assert!(products.get_all("Price", 4, 2, false).unwrap().is_empty());

    assert_eq!(ids(&products.get_all("Price", 1, 2, true).unwrap()), vec![3, 4]);
    assert_eq!(ids(&products.get_all("name", 1, 5, false).unwrap()), vec![4, 3, 1, 2, 5]);
}

#[test]
fn paged_get_all_with_filter() {
    let mut ctx = seeded();
    let products = ctx.entities_of::<Product>().unwrap();

    let lamps = products
        .get_all_where("Name.Contains(\"Lamp\")", "Price", 1, 10, true)
        .unwrap();
    let names: Vec<_> = lamps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Floor Lamp", "Desk Lamp", "Lampshade"]);
}

#[test]
fn page_size_is_capped() {
    let mut ctx = ContextBuilder::new()
        .register::<Product>()
        .options(ContextOptions::new().max_page_size(2))
        .build(InMemoryStore::new());
    {
        let mut products = ctx.entities_of::<Product>().unwrap();
        for id in 1..=5 {
            products.add(Product::new(id, "Item", id as f64)).unwrap();
        }
    }
    ctx.save_changes().unwrap();

    let products = ctx.entities("Products").unwrap();
    assert_eq!(ids(&products.get_all("Id", 1, 100, false).unwrap()), vec![1, 2]);
    assert_eq!(ids(&products.get_all("Id", 2, 100, false).unwrap()), vec![3, 4]);
}

#[test]
fn get_all_rejects_unknown_order_member() {
    let mut ctx = seeded();
    let err = ctx
        .entities("Products")
        .unwrap()
        .get_all("Weight", 1, 10, false)
        .unwrap_err();
    assert!(matches!(
        err,
        ContextError::Filter(FilterError::UnknownMember { ref member, .. }) if member == "Weight"
    ));
}

#[test]
fn query_composes() {
    let ctx = seeded();

    let query = ctx
        .query("Products", "Price < 50")
        .unwrap()
        .filter("not Name.StartsWith('Lamp')")
        .unwrap()
        .order_by("Price desc")
        .unwrap();
    assert_eq!(ids(&query.to_vec().unwrap()), vec![4, 2, 1]);
    assert_eq!(query.count().unwrap(), 3);
    assert_eq!(query.first().unwrap().unwrap()["Id"], 4);

    let window = query.skip(1).take(1);
    assert_eq!(ids(&window.to_vec().unwrap()), vec![2]);
    assert_eq!(window.single().unwrap().unwrap()["Name"], "Floor Lamp");

    let lighting: Vec<Product> = ctx
        .query("Products", "Category.Name == \"Lighting\"")
        .unwrap()
        .order_by("Id")
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(lighting.len(), 2);
    assert_eq!(lighting[0].name, "Desk Lamp");
}

#[test]
fn typed_query() {
    let mut ctx = seeded();
    let products = ctx.entities_of::<Product>().unwrap();

    let cheap = products
        .query("Price <= 12 && !Discontinued")
        .unwrap()
        .order_by("Name")
        .unwrap()
        .to_vec()
        .unwrap();
    let names: Vec<_> = cheap.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Desk Lamp", "Floor Lamp", "Lampshade"]);

    assert_eq!(products.all().count().unwrap(), 5);
}

#[test]
fn malformed_filter_fails_before_reading() {
    let ctx = seeded();
    let err = ctx.query("Products", "Price >").err().unwrap();
    assert!(matches!(err, ContextError::Filter(FilterError::Parse(_))));
}

#[test]
fn remove_where_by_filter() {
    let mut ctx = seeded();

    let removed = ctx
        .entities("Products")
        .unwrap()
        .remove_where("Name.Contains('Lamp')")
        .unwrap();
    let mut removed_ids = ids(&removed);
    removed_ids.sort();
    assert_eq!(removed_ids, vec![1, 2, 5]);
    assert!(ctx
        .pending_changes()
        .iter()
        .all(|c| c.state == ChangeState::Deleted));

    assert_eq!(ctx.save_changes().unwrap(), 3);
    assert_eq!(ctx.store().len("Products").unwrap(), 2);
    assert_eq!(ctx.find("Products", &[json!(1)]).unwrap(), None);
}

#[test]
fn typed_remove_where_by_predicate() {
    let mut ctx = seeded();

    let removed = ctx
        .entities_of::<Product>()
        .unwrap()
        .remove_where(|p| p.price > 40.0)
        .unwrap();
    assert_eq!(removed.len(), 2);

    // Pending deletes hide the records from find.
    assert!(ctx
        .entities_of::<Product>()
        .unwrap()
        .find(&[json!(3)])
        .unwrap()
        .is_none());

    ctx.save_changes().unwrap();
    let remaining: Vec<i64> = ctx
        .store()
        .scan("Products")
        .unwrap()
        .iter()
        .map(|r| r["Id"].as_i64().unwrap())
        .collect();
    assert_eq!(remaining.len(), 3);
    assert!(!remaining.contains(&3) && !remaining.contains(&4));
}

#[test]
fn remove_single_record() {
    let mut ctx = seeded();
    ctx.entities("Products")
        .unwrap()
        .remove(product_record(5, "Lampshade", 3.25))
        .unwrap();
    ctx.save_changes().unwrap();
    assert_eq!(ctx.store().len("Products").unwrap(), 4);
}

#[test]
fn discard_changes_drops_pending_work() {
    let mut ctx = seeded();
    ctx.entities("Products")
        .unwrap()
        .remove_where("Id > 0")
        .unwrap();
    assert_eq!(ctx.pending_changes().len(), 5);

    ctx.discard_changes();
    assert_eq!(ctx.save_changes().unwrap(), 0);
    assert_eq!(ctx.store().len("Products").unwrap(), 5);
}

#[test]
fn unregistered_type_is_rejected() {
    let mut ctx = ContextBuilder::new()
        .register::<Product>()
        .build(InMemoryStore::new());
    let err = ctx.entities_of::<Customer>().err().unwrap();
    assert!(matches!(err, ContextError::TypeNotRegistered { set: "Customers", .. }));
}
