//! Shared fixtures for model tests.

#![allow(dead_code)]

use repolink_model::{
    ChoiceType, ContentTypeDescriptor, ContentTypeRegistry, PropertyAccess, PropertyDescriptor, PropertyType,
    RecordType,
};

/// Single-valued choice: Male = 0, Female = 1.
pub fn gender() -> ChoiceType {
    ChoiceType::single(["Male", "Female"])
}

/// Flag choice: Read = 1, Write = 2, Delete = 4.
pub fn permissions() -> ChoiceType {
    ChoiceType::flags(["Read", "Write", "Delete"])
}

pub fn address() -> RecordType {
    RecordType::new(vec![
        PropertyDescriptor::string("Street"),
        PropertyDescriptor::integer("Zip").with_wire_name("PostalCode"),
    ])
}

pub fn user_descriptor() -> ContentTypeDescriptor {
    ContentTypeDescriptor::new("User").with_properties([
        PropertyDescriptor::string("FullName"),
        PropertyDescriptor::string("Email").with_wire_name("EmailAddress"),
        PropertyDescriptor::choice("Gender", gender()),
        PropertyDescriptor::choice("Permissions", permissions()),
        PropertyDescriptor::integer("LoginCount"),
        PropertyDescriptor::float("Rate"),
        PropertyDescriptor::bool("Enabled"),
        PropertyDescriptor::datetime("BirthDate"),
        PropertyDescriptor::decimal("Salary"),
        PropertyDescriptor::reference("Manager").with_target("User".into()),
        PropertyDescriptor::multi_reference("Groups"),
        PropertyDescriptor::array("Tags", PropertyType::String),
        PropertyDescriptor::record("Address", address()),
        PropertyDescriptor::string("PasswordHash").with_access(PropertyAccess::NonPublic),
        PropertyDescriptor::string("Domain").with_access(PropertyAccess::ReadOnly),
    ])
}

pub fn employee_descriptor() -> ContentTypeDescriptor {
    let mut descriptor = user_descriptor().with_property(PropertyDescriptor::string("Department"));
    descriptor.local_type = "Employee".into();
    descriptor.with_base("User")
}

pub fn workspace_descriptor() -> ContentTypeDescriptor {
    ContentTypeDescriptor::new("Workspace").with_base("Folder").with_properties([
        PropertyDescriptor::bool("IsWallContainer"),
        PropertyDescriptor::reference("Owner"),
        PropertyDescriptor::string("Description"),
    ])
}

pub fn registry() -> ContentTypeRegistry {
    let mut registry = ContentTypeRegistry::new();
    registry
        .register("Folder", ContentTypeDescriptor::new("Folder"))
        .register("Workspace", workspace_descriptor())
        .register("User", user_descriptor())
        .register("Employee", employee_descriptor());
    registry
}
