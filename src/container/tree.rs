//! Container tree
//!
//! The group → (attributes, datasets) structure both backends keep in memory
//! while a container is open.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::array::{Array, ElementKind, Shape};
use crate::error::{Result, SnapshotError};
use crate::header::Attributes;

/// One named group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub attrs: Attributes,
    pub datasets: BTreeMap<String, Array>,
}

/// All groups of one container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerTree {
    groups: BTreeMap<String, Group>,
}

impl ContainerTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, name: &str) -> Result<&Group> {
        self.groups
            .get(name)
            .ok_or_else(|| SnapshotError::MissingGroup(name.to_string()))
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut Group> {
        self.groups
            .get_mut(name)
            .ok_or_else(|| SnapshotError::MissingGroup(name.to_string()))
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn read_attrs(&self, group: &str) -> Result<Attributes> {
        Ok(self.group(group)?.attrs.clone())
    }

    pub fn dataset_names(&self, group: &str) -> Result<Vec<String>> {
        Ok(self.group(group)?.datasets.keys().cloned().collect())
    }

    fn dataset(&self, group: &str, name: &str) -> Result<&Array> {
        self.group(group)?
            .datasets
            .get(name)
            .ok_or_else(|| SnapshotError::MissingDataset {
                group: group.to_string(),
                name: name.to_string(),
            })
    }

    pub fn dataset_shape(&self, group: &str, name: &str) -> Result<(Shape, ElementKind)> {
        let array = self.dataset(group, name)?;
        Ok((array.shape(), array.kind()))
    }

    pub fn read_dataset(&self, group: &str, name: &str) -> Result<Array> {
        self.dataset(group, name).cloned()
    }

    pub fn create_group(&mut self, group: &str) {
        self.groups.entry(group.to_string()).or_default();
    }

    pub fn write_attrs(&mut self, group: &str, attrs: &Attributes) -> Result<()> {
        let target = self.group_mut(group)?;
        for (name, value) in attrs {
            target.attrs.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    pub fn write_dataset(&mut self, group: &str, name: &str, data: &Array) -> Result<()> {
        let target = self.group_mut(group)?;
        if target.datasets.contains_key(name) {
            return Err(SnapshotError::Format(format!(
                "dataset {}/{} already exists",
                group, name
            )));
        }
        target.datasets.insert(name.to_string(), data.clone());
        Ok(())
    }

    /// Check every dataset buffer against its declared shape
    pub fn validate(&self) -> Result<()> {
        for (group_name, group) in &self.groups {
            for (name, array) in &group.datasets {
                if array.data().len() != array.shape().element_count() {
                    return Err(SnapshotError::Format(format!(
                        "dataset {}/{} holds {} elements but declares shape {:?}",
                        group_name,
                        name,
                        array.data().len(),
                        array.shape()
                    )));
                }
            }
        }
        Ok(())
    }
}
