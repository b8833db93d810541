use persistence_core::persistable::{Identifier, Persistable};
use persistence_core::value::Value;
use persistence_macros::{entity, entity_id};

#[entity_id]
struct OrderId(i64);

#[entity(table = "orders", id = OrderId)]
struct Order {
    customer: Option<OrderId>,
}

fn main() {
    let id = OrderId::new(7);
    assert_eq!(id.to_string(), "7");
    assert_eq!(id.to_value(), Value::Int(7));
    assert_eq!(OrderId::from_value(Value::Int(9)).unwrap(), OrderId(9));
    assert_eq!("11".parse::<OrderId>().unwrap(), OrderId::from(11));
    assert_eq!(i64::from(id.clone()), 7);

    let order = Order {
        id: Some(id),
        customer: None,
    };
    assert_eq!(order.values(), vec![Value::Null(persistence_core::value::ValueKind::Int)]);
}
