mod common;

use pretty_assertions::assert_eq;
use repolink_model::{Content, ContentMarshaller, ContentTypeRegistry};
use repolink_query::{InlineCount, MetadataFormat, Method, ODataRequest, Projection, QueryError, SaveRequest};
use serde_json::json;

const SERVER: &str = "https://repo.example.com";

// ── Validation ───────────────────────────────────────────────────

#[test]
fn missing_address_is_rejected_with_fixed_message() {
    let err = ODataRequest::default().build_query_string().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid request properties: either content id or path must be provided."
    );
}

#[test]
fn both_id_and_path_is_rejected_with_the_same_message() {
    let request = ODataRequest {
        content_id: Some(42),
        path: Some("/Root/Sites".into()),
        ..ODataRequest::default()
    };
    let err = request.build_query_string().unwrap_err();
    assert!(matches!(err, QueryError::MissingContentAddress));
}

#[test]
fn zero_id_counts_as_absent() {
    let request = ODataRequest {
        content_id: Some(0),
        path: Some("/Root".into()),
        ..ODataRequest::default()
    };
    assert_eq!(request.build_query_string().unwrap(), "");
}

#[test]
fn action_and_property_conflict() {
    let request = ODataRequest::for_id(42).with_action("A").with_property("P");
    let err = request.build_query_string().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid request properties: both action name and property name are provided."
    );
    assert!(request.to_url(SERVER).is_err());
}

// ── Query string ─────────────────────────────────────────────────

#[test]
fn query_string_field_order_is_fixed() {
    let request = ODataRequest {
        path: Some("/Root/Sites".into()),
        is_collection_request: true,
        version: Some("V1.0A".into()),
        metadata: MetadataFormat::None,
        projection: Projection::build(["DisplayName", "Manager.FullName"]),
        filter: Some("Index gt 3".into()),
        order_by: vec!["Index desc".into(), "Name".into()],
        top: Some(10),
        skip: Some(5),
        inline_count: InlineCount::AllPages,
        content_query: Some("+TypeIs:workspace".into()),
        auto_filters: Some(false),
        lifespan_filter: Some(true),
        parameters: vec![("scenario".into(), "list view".into())],
        ..ODataRequest::default()
    };

    assert_eq!(
        request.build_query_string().unwrap(),
        "metadata=no\
         &$expand=Manager\
         &$select=DisplayName%2CManager%2FFullName\
         &$filter=Index%20gt%203\
         &$orderby=Index%20desc%2CName\
         &$top=10\
         &$skip=5\
         &$inlinecount=allpages\
         &query=%2BTypeIs%3Aworkspace\
         &enableautofilters=false\
         &enablelifespanfilter=true\
         &version=V1.0A\
         &scenario=list%20view"
    );
}

#[test]
fn defaults_emit_nothing() {
    assert_eq!(ODataRequest::for_id(7).build_query_string().unwrap(), "");
}

#[test]
fn minimal_metadata_and_free_parameters_keep_insertion_order() {
    let request = ODataRequest {
        metadata: MetadataFormat::Minimal,
        ..ODataRequest::for_id(7)
    }
    .with_parameter("b", "2")
    .with_parameter("a", "1");
    assert_eq!(request.build_query_string().unwrap(), "metadata=minimal&b=2&a=1");
}

// ── URLs ─────────────────────────────────────────────────────────

#[test]
fn url_by_id() {
    let request = ODataRequest::for_id(42).with_action("CheckOut");
    assert_eq!(
        request.to_url("https://repo.example.com/").unwrap(),
        "https://repo.example.com/OData.svc/content(42)/CheckOut"
    );
}

#[test]
fn url_by_path_addresses_the_entity() {
    let request = ODataRequest::for_path("/Root/Sites/Intranet").with_property("Owner");
    assert_eq!(
        request.to_url(SERVER).unwrap(),
        "https://repo.example.com/OData.svc/Root/Sites('Intranet')/Owner"
    );
}

#[test]
fn url_for_root_level_content() {
    let request = ODataRequest::for_path("/Root");
    assert_eq!(request.to_url(SERVER).unwrap(), "https://repo.example.com/OData.svc/('Root')");
}

#[test]
fn url_for_collection_with_query() {
    let request = ODataRequest::collection("/Root/Sites").with_content_query("Index:>3");
    assert_eq!(
        request.to_url(SERVER).unwrap(),
        "https://repo.example.com/OData.svc/Root/Sites?query=Index%3A%3E3"
    );
}

#[test]
fn bare_slash_does_not_address_an_entity() {
    for path in ["/", " / ", "//"] {
        let err = ODataRequest::for_path(path).to_url(SERVER).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid request properties: either content id or path must be provided."
        );
    }
}

#[test]
fn apostrophes_in_names_are_doubled() {
    let request = ODataRequest::for_path("/Root/Docs/Ann's notes");
    assert_eq!(
        request.to_url(SERVER).unwrap(),
        "https://repo.example.com/OData.svc/Root/Docs('Ann''s notes')"
    );
}

// ── Save planning ────────────────────────────────────────────────

#[test]
fn new_content_posts_to_parent() {
    let registry = common::registry();
    let marshaller = ContentMarshaller::new(&registry);
    let mut content = marshaller.new_content("/Root/Sites", "Workspace");
    content.set("DisplayName", "Intranet").unwrap();

    let save = SaveRequest::for_content(&content, &marshaller).unwrap();
    assert_eq!(save.method, Method::Post);
    assert_eq!(save.request, ODataRequest::collection("/Root/Sites"));
    assert_eq!(save.body, json!({"__ContentType": "Workspace", "DisplayName": "Intranet"}));
}

#[test]
fn existing_content_is_patched_by_id() {
    let registry = common::registry();
    let marshaller = ContentMarshaller::new(&registry);
    let wire = json!({"Id": 42, "Path": "/Root/Sites/Intranet", "Type": "Workspace", "DisplayName": "Intranet"});
    let mut content = marshaller.load_content(&wire, None).unwrap();
    content.set("IsWallContainer", true).unwrap();

    let save = SaveRequest::for_content(&content, &marshaller).unwrap();
    assert_eq!(save.method, Method::Patch);
    assert_eq!(save.request, ODataRequest::for_id(42));
    assert_eq!(save.body, json!({"IsWallContainer": true}));
}

#[test]
fn existing_content_without_id_is_patched_by_path() {
    let registry = common::registry();
    let marshaller = ContentMarshaller::new(&registry);
    let wire = json!({"Path": "/Root/Sites/Intranet", "Type": "Workspace"});
    let content = marshaller.load_content(&wire, None).unwrap();

    let save = SaveRequest::for_content(&content, &marshaller).unwrap();
    assert_eq!(save.request, ODataRequest::for_path("/Root/Sites/Intranet"));
    assert_eq!(save.body, json!({}));
}

#[test]
fn new_content_without_parent_cannot_be_planned() {
    let registry = ContentTypeRegistry::new();
    let marshaller = ContentMarshaller::new(&registry);
    let err = SaveRequest::for_content(&Content::new("Folder"), &marshaller).unwrap_err();
    assert!(matches!(err, QueryError::UnplannableSave(_)));
}
