//! The binary serializer: a two-pass graph codec over `World` snapshots
//! (spec section 4.4), plus the process-wide type registry consulted on
//! decode to recover `Model::class_name`'s `'static` lifetime.

pub mod atom;
pub mod decode;
pub mod encode;
pub mod graph;
pub mod registry;
pub mod varint;

pub use decode::{decode, decode_graph};
pub use encode::{encode, encode_graph};
pub use graph::GraphValue;
pub use registry::{ModelClass, TypeRegistry};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Primitive, Slot, Value, World};

    struct Counter;
    impl ModelClass for Counter {
        const NAME: &'static str = "Counter";
        const SLOTS: &'static [&'static str] = &["value"];
    }

    #[test]
    fn world_roundtrips_through_encode_decode() {
        let mut registry = TypeRegistry::new();
        registry.register::<Counter>().unwrap();

        let world = World::new();
        let id = world.create_model(Counter::NAME, 1).unwrap();
        world.write_slot(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(7))), None).unwrap();

        let bytes = encode(&world);
        let decoded = decode(&bytes, |name| registry.resolve_name(name)).unwrap();

        assert_eq!(decoded.get_slot(&id, 0).unwrap(), Slot::Value(Value::Primitive(Primitive::I64(7))));
    }
}
