//! Explicit bind/call entry points standing in for the source's proxy
//! objects (spec section 9, "Proxies... must be reproduced via explicit
//! bind/call entry points in a systems language"). A generated per-Model
//! wrapper would call `get`/`assign` for slot access and route mutating
//! methods through `WaveApp::call`.

use crate::error::{ChronError, Result};
use crate::world::{Primitive, Ref, Slot, SlotType, World};
use smartstring::alias::String as SmartString;
use std::collections::HashMap;

/// A slot value with Refs downcast to bare id strings, the shape a
/// parameter or result takes crossing the remote-dispatch wire (spec
/// section 6). `Text`/`Markup` values aren't meaningful as call parameters
/// and have no wire representation here.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Primitive(Primitive),
    Ref(SmartString),
}

impl WireValue {
    pub fn from_slot(slot: &Slot) -> Option<WireValue> {
        match slot {
            Slot::None => None,
            Slot::Ref(r) => Some(WireValue::Ref(SmartString::from(r.as_str()))),
            Slot::Value(crate::world::Value::Primitive(p)) => Some(WireValue::Primitive(p.clone())),
            Slot::Value(_) => None,
        }
    }
}

/// The remote dispatch wire record (spec section 6): a method invocation
/// addressed to `caller_key`'s pending-reply slot, tagged with a fresh
/// `call_key` the reply echoes back.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub method: SmartString,
    pub caller_key: SmartString,
    pub call_key: SmartString,
    pub parameters: Vec<WireValue>,
}

/// Slot read through the world resolution chain - what a proxy's property
/// getter dispatches to.
pub fn get(world: &World, id: &Ref, slot: usize) -> Result<Slot> {
    world.get_slot(id, slot)
}

/// Slot write, honoring an optional declared type constraint - what a
/// proxy's property setter dispatches to.
pub fn assign(world: &World, id: &Ref, slot: usize, value: Slot, constraint: Option<SlotType>) -> Result<()> {
    world.write_slot(id, slot, value, constraint)
}

/// A Model method, addressable by name for remote dispatch.
pub type MethodFn = fn(&World, &Ref, &[WireValue]) -> Result<Option<WireValue>>;

/// Maps a registered class's method names to the function implementing them
/// - the dispatch counterpart to `TypeRegistry`'s slot schema, and the piece
/// that lets a receiving host actually "run the call" a `CallRecord` names
/// (spec section 6). Populated once at startup via `register`, the same
/// explicit, macro-free registration `TypeRegistry` uses for slot schemas.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<(&'static str, SmartString), MethodFn>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: &'static str, method: &str, f: MethodFn) {
        self.methods.insert((class_name, method.into()), f);
    }

    fn lookup(&self, class_name: &'static str, method: &str) -> Option<MethodFn> {
        self.methods.get(&(class_name, SmartString::from(method))).copied()
    }
}

/// Run the call a `CallRecord` names against `id`: resolve `id`'s class via
/// `world`, look up the registered method for `(class, record.method)`, and
/// invoke it. This is what a receiving host does on receipt of the record
/// (spec section 6) - the missing piece once `CallRecord` itself only
/// describes the invocation rather than running it.
pub fn dispatch(world: &World, registry: &MethodRegistry, id: &Ref, record: &CallRecord) -> Result<Option<WireValue>> {
    let model = world.bind(id)?;
    let f = registry
        .lookup(model.class_name, &record.method)
        .ok_or_else(|| ChronError::UnknownMethod { class_name: model.class_name, method: record.method.to_string() })?;
    f(world, id, &record.parameters)
}

/// Build the wire record for a call and run it immediately against
/// `registry` - spec section 6's `call(ref, method, args[])`. The record
/// itself is what would cross the wire to a remote host; this crate runs it
/// in-process since network transport is out of scope.
pub fn call(
    world: &World,
    registry: &MethodRegistry,
    id: &Ref,
    method: &str,
    caller_key: &str,
    call_key: &str,
    parameters: Vec<WireValue>,
) -> Result<Option<WireValue>> {
    let record = CallRecord {
        method: method.into(),
        caller_key: caller_key.into(),
        call_key: call_key.into(),
        parameters,
    };
    dispatch(world, registry, id, &record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Value;

    fn read_slot_zero(world: &World, id: &Ref, _params: &[WireValue]) -> Result<Option<WireValue>> {
        let slot = world.get_slot(id, 0)?;
        Ok(WireValue::from_slot(&slot))
    }

    #[test]
    fn call_dispatches_to_the_registered_method() {
        let world = World::new();
        let id = world.create_model("Counter", 1).unwrap();
        world.write_slot(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(42))), None).unwrap();

        let mut registry = MethodRegistry::new();
        registry.register("Counter", "get", read_slot_zero);

        let result = call(&world, &registry, &id, "get", "caller-1", "call-1", vec![]).unwrap();
        assert_eq!(result, Some(WireValue::Primitive(Primitive::I64(42))));
    }

    #[test]
    fn call_to_an_unregistered_method_errors() {
        let world = World::new();
        let id = world.create_model("Counter", 1).unwrap();
        let registry = MethodRegistry::new();

        let err = call(&world, &registry, &id, "missing", "c", "k", vec![]).unwrap_err();
        assert_eq!(err, ChronError::UnknownMethod { class_name: "Counter", method: "missing".to_string() });
    }
}
