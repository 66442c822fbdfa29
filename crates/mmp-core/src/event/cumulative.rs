// Shallow-merge accumulator for partial event payloads.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Patch;

/// Accumulated state built from a sequence of patches.
///
/// Each patch overwrites the keys it carries and leaves the rest alone.
/// Nested objects are replaced wholesale, not merged.
#[derive(Debug, Clone)]
pub struct Cumulative<T> {
    initial: T,
    merged: Patch,
    updates: u64,
}

impl<T> Cumulative<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(initial: T) -> Self {
        let merged = to_patch(&initial);
        Self {
            initial,
            merged,
            updates: 0,
        }
    }

    /// Merge a patch into the accumulated state.
    pub fn apply(&mut self, patch: &Patch) {
        for (key, value) in patch {
            self.merged.insert(key.clone(), value.clone());
        }
        self.updates += 1;
    }

    /// Drop everything merged so far.
    pub fn reset(&mut self) {
        self.merged = to_patch(&self.initial);
        self.updates = 0;
    }

    /// Patches applied since creation or the last reset.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Merged JSON object.
    pub fn raw(&self) -> &Patch {
        &self.merged
    }

    /// Decode the merged object, or the initial value if it no longer fits `T`.
    pub fn value(&self) -> T {
        match serde_json::from_value(Value::Object(self.merged.clone())) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "cumulative state does not decode, using initial value");
                self.initial.clone()
            }
        }
    }
}

fn to_patch<T: Serialize>(value: &T) -> Patch {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Patch::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Thermal;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn patch(v: Value) -> Patch {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn patches_merge_shallowly() {
        let mut acc: Cumulative<Value> = Cumulative::new(json!({}));
        acc.apply(&patch(json!({ "temperature": 60 })));
        acc.apply(&patch(json!({ "target": 65 })));
        assert_eq!(acc.value(), json!({ "temperature": 60, "target": 65 }));

        acc.apply(&patch(json!({ "temperature": 61 })));
        assert_eq!(acc.value(), json!({ "temperature": 61, "target": 65 }));
    }

    #[test]
    fn nested_objects_are_replaced() {
        let mut acc: Cumulative<Value> = Cumulative::new(json!({}));
        acc.apply(&patch(json!({ "pos": { "x": 1, "y": 2 } })));
        acc.apply(&patch(json!({ "pos": { "x": 5 } })));
        assert_eq!(acc.value(), json!({ "pos": { "x": 5 } }));
    }

    #[test]
    fn reset_restores_initial() {
        let mut acc = Cumulative::new(Thermal::default());
        acc.apply(&patch(json!({ "temperature": 200.0, "target": 210.0 })));
        assert_eq!(acc.value().target, Some(210.0));

        assert_eq!(acc.updates(), 1);

        acc.reset();
        assert_eq!(acc.value(), Thermal::default());
        assert_eq!(acc.updates(), 0);
    }

    #[test]
    fn undecodable_state_falls_back_to_initial() {
        let initial = Thermal {
            temperature: 20.0,
            target: None,
        };
        let mut acc = Cumulative::new(initial.clone());
        acc.apply(&patch(json!({ "temperature": "hot" })));
        assert_eq!(acc.value(), initial);
        assert_eq!(acc.raw().get("temperature"), Some(&json!("hot")));
    }
}
