//! Shared fixtures for query tests.

#![allow(dead_code)]

use repolink_model::{ContentTypeDescriptor, ContentTypeRegistry, PropertyDescriptor};

pub fn workspace_descriptor() -> ContentTypeDescriptor {
    ContentTypeDescriptor::new("Workspace").with_base("Folder").with_properties([
        PropertyDescriptor::bool("IsWallContainer"),
        PropertyDescriptor::string("DisplayName"),
        PropertyDescriptor::integer("Rating").with_wire_name("RateAvg"),
        PropertyDescriptor::datetime("Deadline"),
        PropertyDescriptor::decimal("Budget"),
        PropertyDescriptor::reference("Manager"),
    ])
}

pub fn registry() -> ContentTypeRegistry {
    let mut registry = ContentTypeRegistry::new();
    registry
        .register("Folder", ContentTypeDescriptor::new("Folder"))
        .register("Workspace", workspace_descriptor());
    registry
}
