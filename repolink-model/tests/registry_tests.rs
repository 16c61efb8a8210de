mod common;

use repolink_model::{ContentTypeDescriptor, ContentTypeRegistry, ModelError, TypeHandle};

// ── Resolution ───────────────────────────────────────────────────

#[test]
fn resolve_type_by_wire_name() {
    let registry = common::registry();
    assert_eq!(registry.resolve_type("Workspace"), Some(&TypeHandle::new("Workspace")));
    assert!(registry.resolve_type("Article").is_none());
}

#[test]
fn descriptor_for_name_returns_property_table() {
    let registry = common::registry();
    let descriptor = registry.descriptor_for_name("Workspace").unwrap();
    assert!(descriptor.property("IsWallContainer").is_some());
    assert_eq!(descriptor.base, Some(TypeHandle::new("Folder")));
}

#[test]
fn resolve_name_of_none_is_empty() {
    let registry = common::registry();
    assert_eq!(registry.resolve_name(None).unwrap(), "");
}

#[test]
fn resolve_name_single_registration() {
    let registry = common::registry();
    assert_eq!(registry.resolve_name(Some(&"User".into())).unwrap(), "User");
}

#[test]
fn resolve_name_unregistered_uses_local_name() {
    let registry = ContentTypeRegistry::new();
    assert_eq!(registry.resolve_name(Some(&"Memo".into())).unwrap(), "Memo");
}

// ── Last write wins ──────────────────────────────────────────────

#[test]
fn re_registering_a_name_replaces_the_type() {
    let mut registry = ContentTypeRegistry::new();
    registry.register("Article", ContentTypeDescriptor::new("LibraryArticle"));
    registry.register("Article", ContentTypeDescriptor::new("AppArticle"));

    assert_eq!(registry.resolve_type("Article"), Some(&TypeHandle::new("AppArticle")));
    assert!(registry.names_of(&"LibraryArticle".into()).is_empty());
    assert_eq!(registry.len(), 1);
}

#[test]
fn registries_are_independent() {
    let mut first = ContentTypeRegistry::new();
    let mut second = ContentTypeRegistry::new();
    first.register("Article", ContentTypeDescriptor::new("NewsItem"));
    second.register("Article", ContentTypeDescriptor::new("BlogPost"));

    assert_eq!(first.resolve_type("Article"), Some(&TypeHandle::new("NewsItem")));
    assert_eq!(second.resolve_type("Article"), Some(&TypeHandle::new("BlogPost")));
}

// ── Ambiguity ────────────────────────────────────────────────────

fn task_registry() -> ContentTypeRegistry {
    let mut registry = ContentTypeRegistry::new();
    registry
        .register("TodoItem", ContentTypeDescriptor::new("Task"))
        .register("Task", ContentTypeDescriptor::new("Task"));
    registry
}

#[test]
fn two_names_for_one_type_is_ambiguous() {
    let registry = task_registry();
    let err = registry.resolve_name(Some(&"Task".into())).unwrap_err();
    match &err {
        ModelError::AmbiguousTypeName { local_type, names } => {
            assert_eq!(local_type, "Task");
            assert_eq!(names, &vec!["Task".to_string(), "TodoItem".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("Task, TodoItem"));
}

#[test]
fn default_name_disambiguates() {
    let mut registry = task_registry();
    registry.set_default_name(&"Task".into(), "TodoItem").unwrap();
    assert_eq!(registry.resolve_name(Some(&"Task".into())).unwrap(), "TodoItem");
}

#[test]
fn default_name_must_be_registered_for_the_type() {
    let mut registry = task_registry();
    let err = registry.set_default_name(&"Task".into(), "Chore").unwrap_err();
    assert!(matches!(err, ModelError::UnknownTypeName(name) if name == "Chore"));
}

#[test]
fn stale_default_is_ignored() {
    let mut registry = task_registry();
    registry.set_default_name(&"Task".into(), "TodoItem").unwrap();
    registry.register("TodoItem", ContentTypeDescriptor::new("Checklist"));
    registry.register("Chore", ContentTypeDescriptor::new("Task"));

    assert!(matches!(
        registry.resolve_name(Some(&"Task".into())),
        Err(ModelError::AmbiguousTypeName { .. })
    ));
}
