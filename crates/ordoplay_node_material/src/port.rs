// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection points (ports) on blocks.

use crate::block::BlockId;
use crate::types::{ConnectionPointType, PortDirection};
use crate::value::ShaderValue;
use serde::{Deserialize, Serialize};

/// Handle to a port: owning block, direction and index in that block's port list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning block
    pub block: BlockId,
    /// Input or output side
    pub direction: PortDirection,
    /// Index in the block's input or output list
    pub index: usize,
}

impl PortRef {
    /// Handle to an input port
    pub fn input(block: BlockId, index: usize) -> Self {
        Self {
            block,
            direction: PortDirection::Input,
            index,
        }
    }

    /// Handle to an output port
    pub fn output(block: BlockId, index: usize) -> Self {
        Self {
            block,
            direction: PortDirection::Output,
            index,
        }
    }
}

/// A typed input or output slot on a block
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPoint {
    /// Port name, unique per direction within a block
    pub name: String,
    direction: PortDirection,
    inner_type: ConnectionPointType,
    is_optional: bool,
    excluded: Vec<ConnectionPointType>,
    accepted: Vec<ConnectionPointType>,
    type_connection_source: Option<usize>,
    linked_connection_source: Option<usize>,
    default_value: Option<ShaderValue>,
    connected_point: Option<PortRef>,
    endpoints: Vec<PortRef>,
}

impl ConnectionPoint {
    /// Create a new port
    pub fn new(
        name: impl Into<String>,
        direction: PortDirection,
        inner_type: ConnectionPointType,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            inner_type,
            is_optional: false,
            excluded: Vec::new(),
            accepted: Vec::new(),
            type_connection_source: None,
            linked_connection_source: None,
            default_value: None,
            connected_point: None,
            endpoints: Vec::new(),
        }
    }

    /// Port direction
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Declared type, possibly a placeholder
    pub fn inner_type(&self) -> ConnectionPointType {
        self.inner_type
    }

    /// Whether the port may stay unconnected
    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// Types this port refuses
    pub fn excluded_types(&self) -> &[ConnectionPointType] {
        &self.excluded
    }

    /// Extra types this port accepts besides its own
    pub fn accepted_types(&self) -> &[ConnectionPointType] {
        &self.accepted
    }

    /// Input index whose type a `BasedOnInput` output copies
    pub fn type_connection_source(&self) -> Option<usize> {
        self.type_connection_source
    }

    /// Input index this input must agree with
    pub fn linked_connection_source(&self) -> Option<usize> {
        self.linked_connection_source
    }

    /// Literal used when the input is unconnected
    pub fn default_value(&self) -> Option<&ShaderValue> {
        self.default_value.as_ref()
    }

    /// Replace the default literal
    pub fn set_default_value(&mut self, value: Option<ShaderValue>) {
        self.default_value = value;
    }

    /// Source of an input, if connected
    pub fn connected_point(&self) -> Option<PortRef> {
        self.connected_point
    }

    /// Whether an input has a source
    pub fn is_connected(&self) -> bool {
        match self.direction {
            PortDirection::Input => self.connected_point.is_some(),
            PortDirection::Output => !self.endpoints.is_empty(),
        }
    }

    /// Inputs fed by this output
    pub fn endpoints(&self) -> &[PortRef] {
        &self.endpoints
    }

    /// Whether an output has at least one consumer
    pub fn has_endpoints(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Mark the port as optional
    pub fn optional(&mut self) -> &mut Self {
        self.is_optional = true;
        self
    }

    /// Set the default literal
    pub fn with_default(&mut self, value: ShaderValue) -> &mut Self {
        self.default_value = Some(value);
        self
    }

    /// Refuse connections of these types
    pub fn exclude(&mut self, types: &[ConnectionPointType]) -> &mut Self {
        self.excluded.extend_from_slice(types);
        self
    }

    /// Accept connections of these types in addition to the declared one
    pub fn accept(&mut self, types: &[ConnectionPointType]) -> &mut Self {
        self.accepted.extend_from_slice(types);
        self
    }

    pub(crate) fn set_connected_point(&mut self, source: Option<PortRef>) {
        self.connected_point = source;
    }

    pub(crate) fn add_endpoint(&mut self, target: PortRef) {
        if !self.endpoints.contains(&target) {
            self.endpoints.push(target);
        }
    }

    pub(crate) fn remove_endpoint(&mut self, target: PortRef) {
        self.endpoints.retain(|e| *e != target);
    }

    pub(crate) fn clear_links(&mut self) {
        self.connected_point = None;
        self.endpoints.clear();
    }
}

/// Collects the ports a block declares when it is created
#[derive(Debug, Default)]
pub struct PortRegistrar {
    inputs: Vec<ConnectionPoint>,
    outputs: Vec<ConnectionPoint>,
}

impl PortRegistrar {
    /// Create an empty registrar
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an input
    pub fn register_input(
        &mut self,
        name: &str,
        ty: ConnectionPointType,
        is_optional: bool,
    ) -> &mut ConnectionPoint {
        let mut port = ConnectionPoint::new(name, PortDirection::Input, ty);
        port.is_optional = is_optional;
        self.inputs.push(port);
        let last = self.inputs.len() - 1;
        &mut self.inputs[last]
    }

    /// Declare an output
    pub fn register_output(&mut self, name: &str, ty: ConnectionPointType) -> &mut ConnectionPoint {
        self.outputs
            .push(ConnectionPoint::new(name, PortDirection::Output, ty));
        let last = self.outputs.len() - 1;
        &mut self.outputs[last]
    }

    /// Require two inputs to resolve to the same type
    pub fn link_connection_types(&mut self, a: &str, b: &str) {
        let (Some(ia), Some(ib)) = (self.input_index(a), self.input_index(b)) else {
            debug_assert!(false, "linking unknown inputs {a} and {b}");
            return;
        };
        self.inputs[ia].linked_connection_source = Some(ib);
        self.inputs[ib].linked_connection_source = Some(ia);
    }

    /// Make `input` adopt the type of `partner` without a reverse link
    pub fn follow_connection_type(&mut self, input: &str, partner: &str) {
        let (Some(i), Some(p)) = (self.input_index(input), self.input_index(partner)) else {
            debug_assert!(false, "linking unknown inputs {input} and {partner}");
            return;
        };
        self.inputs[i].linked_connection_source = Some(p);
    }

    /// Make a `BasedOnInput` output take the type of an input
    pub fn set_type_connection_source(&mut self, output: &str, input: &str) {
        let Some(source) = self.input_index(input) else {
            debug_assert!(false, "unknown type source {input}");
            return;
        };
        if let Some(port) = self.outputs.iter_mut().find(|p| p.name == output) {
            port.type_connection_source = Some(source);
        }
    }

    fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Consume the registrar into input and output lists
    pub fn finish(self) -> (Vec<ConnectionPoint>, Vec<ConnectionPoint>) {
        (self.inputs, self.outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionPointType::*;

    #[test]
    fn test_registrar_links() {
        let mut reg = PortRegistrar::new();
        reg.register_input("left", AutoDetect, false);
        reg.register_input("right", AutoDetect, false);
        reg.register_output("output", BasedOnInput);
        reg.link_connection_types("left", "right");
        reg.set_type_connection_source("output", "left");
        let (inputs, outputs) = reg.finish();

        assert_eq!(inputs[0].linked_connection_source(), Some(1));
        assert_eq!(inputs[1].linked_connection_source(), Some(0));
        assert_eq!(outputs[0].type_connection_source(), Some(0));
    }

    #[test]
    fn test_port_builders() {
        let mut reg = PortRegistrar::new();
        reg.register_input("seed", Vector2, false)
            .accept(&[Vector3, Vector4])
            .with_default(ShaderValue::Vector2([0.0, 0.0]));
        let (inputs, _) = reg.finish();

        assert_eq!(inputs[0].accepted_types(), &[Vector3, Vector4]);
        assert!(inputs[0].default_value().is_some());
        assert!(!inputs[0].is_optional());
    }

    #[test]
    fn test_endpoints() {
        let mut port = ConnectionPoint::new("output", PortDirection::Output, Float);
        assert!(!port.has_endpoints());
        let target = PortRef::input(BlockId(3), 0);
        port.add_endpoint(target);
        port.add_endpoint(target);
        assert_eq!(port.endpoints().len(), 1);
        port.remove_endpoint(target);
        assert!(!port.has_endpoints());
    }
}
