//! Per-invocation container for shape construction results.
use crate::attributes::{AttributeMap, AttributeMapBuilder};
use crate::engine::{GeometryDescriptor, InitialShape};
use crate::error::{Error, Result};
use crate::shape::partition::ClassifierValue;
use crate::shape::MainAttributes;

/// Geometry and resolved main attributes of one primitive group.
#[derive(Clone, Debug)]
pub struct InitialShapeBuilder {
    pub geometry: GeometryDescriptor,
    pub main: MainAttributes,
    pub classifier: ClassifierValue,
}

/// Builders, primitive mappings and names (one per group) plus the engine
/// shapes and their attribute maps (one per successfully created shape).
///
/// Dropping the container releases every engine shape it owns.
#[derive(Debug, Default)]
pub struct ShapeData {
    builders: Vec<InitialShapeBuilder>,
    primitive_mappings: Vec<Vec<usize>>,
    names: Vec<String>,
    shapes: Vec<InitialShape>,
    attribute_builders: Vec<AttributeMapBuilder>,
    rule_attributes: Vec<AttributeMap>,
}

impl ShapeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_builder(&mut self, builder: InitialShapeBuilder, prims: Vec<usize>, name: String) {
        self.builders.push(builder);
        self.primitive_mappings.push(prims);
        self.names.push(name);
    }

    pub fn add_shape(&mut self, shape: InitialShape, builder: AttributeMapBuilder, attributes: AttributeMap) {
        self.shapes.push(shape);
        self.attribute_builders.push(builder);
        self.rule_attributes.push(attributes);
    }

    pub fn builder_count(&self) -> usize {
        self.builders.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn builders(&self) -> &[InitialShapeBuilder] {
        &self.builders
    }

    pub fn builder(&self, group: usize) -> &InitialShapeBuilder {
        &self.builders[group]
    }

    pub fn primitive_mapping(&self, group: usize) -> &[usize] {
        &self.primitive_mappings[group]
    }

    pub fn name(&self, group: usize) -> &str {
        &self.names[group]
    }

    pub fn shapes(&self) -> &[InitialShape] {
        &self.shapes
    }

    /// Rule attributes passed to the engine for shape `index`.
    pub fn rule_attributes(&self, index: usize) -> &AttributeMap {
        &self.rule_attributes[index]
    }

    pub fn attribute_builder(&self, index: usize) -> &AttributeMapBuilder {
        &self.attribute_builders[index]
    }

    /// Engine shapes together with their attribute builders, for filling the
    /// builders from engine output.
    pub fn shapes_and_attribute_builders_mut(&mut self) -> (&[InitialShape], &mut [AttributeMapBuilder]) {
        (&self.shapes, &mut self.attribute_builders)
    }

    /// Checks the parallel-array invariants.
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    pub fn check(&self) -> Result<()> {
        if self.builders.len() != self.primitive_mappings.len() || self.builders.len() != self.names.len() {
            return Err(Error::InvalidShapeData(format!(
                "{} builders, {} primitive mappings, {} names",
                self.builders.len(),
                self.primitive_mappings.len(),
                self.names.len()
            )));
        }
        if self.shapes.len() != self.attribute_builders.len()
            || self.shapes.len() != self.rule_attributes.len()
        {
            return Err(Error::InvalidShapeData(format!(
                "{} shapes, {} attribute builders, {} attribute maps",
                self.shapes.len(),
                self.attribute_builders.len(),
                self.rule_attributes.len()
            )));
        }
        if let Some(bad) = self.shapes.iter().find(|s| s.group() >= self.builders.len()) {
            return Err(Error::InvalidShapeData(format!(
                "shape '{}' refers to missing group {}",
                bad.name(),
                bad.group()
            )));
        }
        Ok(())
    }
}
