//! Static analysis of method descriptions: every rejected declaration.

use std::sync::Arc;

use assert2::{check, let_assert};
use plier::{
    BuildError, BuildErrorKind, CallAdapterResolver, ConverterResolver, Declaration,
    JsonConverterFactory, Method, MethodDescriptor, RequestTemplate, ServiceMethod, TypeDesc,
};

fn template(descriptor: &MethodDescriptor) -> Result<RequestTemplate, BuildError> {
    RequestTemplate::build(descriptor, &ConverterResolver::default())
}

fn kind_of(descriptor: &MethodDescriptor) -> BuildErrorKind {
    let_assert!(Err(err) = template(descriptor));
    err.kind
}

fn service(descriptor: &MethodDescriptor) -> Result<ServiceMethod, BuildError> {
    let converters = ConverterResolver::new(vec![Arc::new(JsonConverterFactory)]);
    ServiceMethod::build(descriptor, &converters, &CallAdapterResolver::default())
}

fn method(name: &str) -> MethodDescriptor {
    MethodDescriptor::new(name)
}

fn string_map() -> TypeDesc {
    TypeDesc::map(TypeDesc::string(), TypeDesc::string())
}

// ============================================================================
// Method declarations
// ============================================================================

#[test]
fn conflicting_encoding_regardless_of_parameters() {
    let bare = method("upload")
        .declare(Declaration::post("upload"))
        .declare(Declaration::form_url_encoded())
        .declare(Declaration::multipart());
    check!(kind_of(&bare) == BuildErrorKind::ConflictingEncoding);

    let with_params = bare
        .clone()
        .param(TypeDesc::string(), [Declaration::field("a")])
        .param(TypeDesc::string(), [Declaration::part("b")]);
    check!(kind_of(&with_params) == BuildErrorKind::ConflictingEncoding);

    let reversed = method("upload")
        .declare(Declaration::post("upload"))
        .declare(Declaration::multipart())
        .declare(Declaration::form_url_encoded());
    check!(kind_of(&reversed) == BuildErrorKind::ConflictingEncoding);
}

#[test]
fn http_method_is_required_and_unique() {
    check!(kind_of(&method("nothing")) == BuildErrorKind::MissingHttpMethod);

    let twice = method("twice")
        .declare(Declaration::get("a"))
        .declare(Declaration::post("b"));
    check!(
        kind_of(&twice)
            == BuildErrorKind::DuplicateHttpMethod {
                first: "GET".to_string(),
                second: "POST".to_string(),
            }
    );
}

#[test]
fn encoding_requires_a_body() {
    let form = method("search")
        .declare(Declaration::get("search"))
        .declare(Declaration::form_url_encoded());
    check!(kind_of(&form) == BuildErrorKind::EncodingRequiresBody("FormUrlEncoded"));

    let multipart = method("search")
        .declare(Declaration::http(Method::Delete, "items", false))
        .declare(Declaration::multipart());
    check!(kind_of(&multipart) == BuildErrorKind::EncodingRequiresBody("Multipart"));
}

#[test]
fn malformed_headers() {
    for line in ["X-Foo", ": value", "X-Foo:"] {
        let descriptor = method("h")
            .declare(Declaration::get("h"))
            .declare(Declaration::headers([line]));
        let_assert!(BuildErrorKind::MalformedDeclaration(message) = kind_of(&descriptor));
        check!(message.contains(line));
    }

    let empty = method("h")
        .declare(Declaration::get("h"))
        .declare(Declaration::headers(Vec::<String>::new()));
    let_assert!(BuildErrorKind::MalformedDeclaration(_) = kind_of(&empty));
}

#[test]
fn malformed_content_type() {
    let descriptor = method("h")
        .declare(Declaration::post("h"))
        .declare(Declaration::headers(["Content-Type: not a type"]));
    check!(kind_of(&descriptor) == BuildErrorKind::MalformedContentType("not a type".to_string()));
}

#[test]
fn parameter_declaration_at_method_level() {
    let descriptor = method("h")
        .declare(Declaration::get("h"))
        .declare(Declaration::body());
    let_assert!(BuildErrorKind::MalformedDeclaration(message) = kind_of(&descriptor));
    check!(message.contains("@Body"));
}

#[test]
fn query_placeholder_in_path() {
    let descriptor = method("list")
        .declare(Declaration::get("users?sort={sort}"))
        .param(TypeDesc::string(), [Declaration::path("sort")]);
    check!(kind_of(&descriptor) == BuildErrorKind::QueryPlaceholderInPath("sort={sort}".to_string()));
}

#[test]
fn static_query_without_placeholder_is_fine() {
    let descriptor = method("list").declare(Declaration::get("users?sort=name"));
    let template = template(&descriptor).expect("template");
    check!(template.relative_url() == Some("users?sort=name"));
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn parameter_needs_exactly_one_binding() {
    let none = method("p")
        .declare(Declaration::get("p"))
        .param(TypeDesc::string(), [Declaration::tag("trace")]);
    check!(kind_of(&none) == BuildErrorKind::NoParameterAnnotation);

    let two = method("p")
        .declare(Declaration::get("p"))
        .param(TypeDesc::string(), [Declaration::query("a"), Declaration::header("b")]);
    check!(kind_of(&two) == BuildErrorKind::MultipleAnnotationsOnParameter);
}

#[test]
fn parameter_errors_carry_position_and_type() {
    let descriptor = method("getUser")
        .declare(Declaration::get("users"))
        .param(TypeDesc::string(), [Declaration::query("q")])
        .param(TypeDesc::seq(TypeDesc::Wildcard), [Declaration::query("tags")]);

    let_assert!(Err(err) = template(&descriptor));
    check!(err.method == "getUser");
    let_assert!(Some(param) = &err.parameter);
    check!(param.index == 1);
    check!(param.ty == "Vec<?>");
    check!(err.kind == BuildErrorKind::UnresolvableType("Vec<?>".to_string()));
    check!(
        err.to_string()
            == "parameter type must not include a type variable or wildcard: Vec<?> \
                (parameter #2: Vec<?>) for method getUser"
    );
}

#[test]
fn url_rules() {
    let twice = method("u")
        .declare(Declaration::get(""))
        .param(TypeDesc::url(), [Declaration::url()])
        .param(TypeDesc::url(), [Declaration::url()]);
    check!(kind_of(&twice) == BuildErrorKind::MultipleUrl);

    let with_path = method("u")
        .declare(Declaration::get("users"))
        .param(TypeDesc::string(), [Declaration::url()]);
    check!(kind_of(&with_path) == BuildErrorKind::UrlWithMethodPath);

    let after_query = method("u")
        .declare(Declaration::get(""))
        .param(TypeDesc::string(), [Declaration::query("q")])
        .param(TypeDesc::string(), [Declaration::url()]);
    check!(kind_of(&after_query) == BuildErrorKind::UrlAfter("@Query"));

    let after_query_map = method("u")
        .declare(Declaration::get(""))
        .param(string_map(), [Declaration::query_map()])
        .param(TypeDesc::string(), [Declaration::url()]);
    check!(kind_of(&after_query_map) == BuildErrorKind::UrlAfter("@QueryMap"));

    let bad_type = method("u")
        .declare(Declaration::get(""))
        .param(TypeDesc::named("u64"), [Declaration::url()]);
    check!(kind_of(&bad_type) == BuildErrorKind::InvalidUrlType);

    let uri = method("u")
        .declare(Declaration::get(""))
        .param(TypeDesc::named("Uri"), [Declaration::url()]);
    check!(template(&uri).is_ok());
}

#[test]
fn path_rules() {
    let after_query = method("p")
        .declare(Declaration::get("users/{id}"))
        .param(TypeDesc::string(), [Declaration::query("q")])
        .param(TypeDesc::string(), [Declaration::path("id")]);
    check!(kind_of(&after_query) == BuildErrorKind::PathAfter("@Query"));

    let with_url = method("p")
        .declare(Declaration::get(""))
        .param(TypeDesc::string(), [Declaration::url()])
        .param(TypeDesc::string(), [Declaration::path("id")]);
    check!(kind_of(&with_url) == BuildErrorKind::PathWithUrl);

    let without_path = method("p")
        .declare(Declaration::get(""))
        .param(TypeDesc::string(), [Declaration::path("id")]);
    check!(kind_of(&without_path) == BuildErrorKind::PathWithoutMethodPath);

    let bad_name = method("p")
        .declare(Declaration::get("users/{id}"))
        .param(TypeDesc::string(), [Declaration::path("1d")]);
    check!(kind_of(&bad_name) == BuildErrorKind::InvalidPathName("1d".to_string()));

    let unknown = method("p")
        .declare(Declaration::get("users/{id}"))
        .param(TypeDesc::string(), [Declaration::path("name")]);
    check!(
        kind_of(&unknown)
            == BuildErrorKind::UnknownPathPlaceholder {
                path: "users/{id}".to_string(),
                name: "name".to_string(),
            }
    );
}

#[test]
fn unbound_placeholder() {
    let descriptor = method("p")
        .declare(Declaration::get("users/{id}/posts/{post}"))
        .param(TypeDesc::string(), [Declaration::path("id")]);
    check!(kind_of(&descriptor) == BuildErrorKind::UnboundPathPlaceholder("post".to_string()));
}

#[test]
fn placeholders_are_ordered_and_unique() {
    let descriptor = method("p")
        .declare(Declaration::get("a/{id}/b/{id}/c/{name}"))
        .param(TypeDesc::string(), [Declaration::path("name")])
        .param(TypeDesc::string(), [Declaration::path("id")]);
    let template = template(&descriptor).expect("template");
    check!(template.path_param_names() == ["id", "name"]);
}

#[test]
fn map_rules() {
    let not_a_map = method("m")
        .declare(Declaration::get("m"))
        .param(TypeDesc::string(), [Declaration::query_map()]);
    check!(kind_of(&not_a_map) == BuildErrorKind::MapTypeRequired("@QueryMap"));

    let int_keys = method("m")
        .declare(Declaration::get("m"))
        .param(
            TypeDesc::map(TypeDesc::named("u32"), TypeDesc::string()),
            [Declaration::header_map()],
        );
    check!(kind_of(&int_keys) == BuildErrorKind::MapKeyNotString("@HeaderMap", "u32".to_string()));
}

#[test]
fn field_requires_form_encoding() {
    let descriptor = method("submit")
        .declare(Declaration::post("submit"))
        .param(TypeDesc::string(), [Declaration::field("name")]);
    check!(kind_of(&descriptor) == BuildErrorKind::FieldRequiresFormEncoding("@Field"));

    let map = method("submit")
        .declare(Declaration::post("submit"))
        .param(string_map(), [Declaration::field_map()]);
    check!(kind_of(&map) == BuildErrorKind::FieldRequiresFormEncoding("@FieldMap"));
}

#[test]
fn part_rules() {
    let not_multipart = method("up")
        .declare(Declaration::post("up"))
        .param(TypeDesc::string(), [Declaration::part("a")]);
    check!(kind_of(&not_multipart) == BuildErrorKind::PartRequiresMultipart("@Part"));

    let multipart = || method("up").declare(Declaration::post("up")).declare(Declaration::multipart());

    let unnamed = multipart().param(TypeDesc::string(), [Declaration::raw_part()]);
    check!(kind_of(&unnamed) == BuildErrorKind::PartNameRequired);

    let named_raw = multipart().param(TypeDesc::part(), [Declaration::part("a")]);
    check!(kind_of(&named_raw) == BuildErrorKind::RawPartWithName);

    let named_raw_list = multipart().param(TypeDesc::seq(TypeDesc::part()), [Declaration::part("a")]);
    check!(kind_of(&named_raw_list) == BuildErrorKind::RawPartWithName);

    let raw_map = multipart().param(
        TypeDesc::map(TypeDesc::string(), TypeDesc::part()),
        [Declaration::part_map()],
    );
    check!(kind_of(&raw_map) == BuildErrorKind::PartMapRawPartValue);

    let raw_list = multipart().param(TypeDesc::seq(TypeDesc::part()), [Declaration::raw_part()]);
    check!(template(&raw_list).is_ok());
}

#[test]
fn body_rules() {
    let form = method("b")
        .declare(Declaration::post("b"))
        .declare(Declaration::form_url_encoded())
        .param(TypeDesc::string(), [Declaration::field("f")])
        .param(TypeDesc::bytes(), [Declaration::body()]);
    check!(kind_of(&form) == BuildErrorKind::BodyWithEncoding);

    let twice = method("b")
        .declare(Declaration::post("b"))
        .param(TypeDesc::bytes(), [Declaration::body()])
        .param(TypeDesc::bytes(), [Declaration::body()]);
    check!(kind_of(&twice) == BuildErrorKind::MultipleBody);

    let on_get = method("b")
        .declare(Declaration::get("b"))
        .param(TypeDesc::bytes(), [Declaration::body()]);
    check!(kind_of(&on_get) == BuildErrorKind::BodyWithoutRequestBody);

    let custom_verb = method("b")
        .declare(Declaration::http(Method::Delete, "b", true))
        .param(TypeDesc::bytes(), [Declaration::body()]);
    check!(template(&custom_verb).is_ok());
}

#[test]
fn final_checks() {
    let no_url = method("f").declare(Declaration::get(""));
    check!(
        kind_of(&no_url)
            == BuildErrorKind::MissingUrl {
                verb: "GET".to_string()
            }
    );

    let empty_form = method("f")
        .declare(Declaration::post("f"))
        .declare(Declaration::form_url_encoded());
    check!(kind_of(&empty_form) == BuildErrorKind::EmptyFormEncoding);

    let empty_multipart = method("f")
        .declare(Declaration::post("f"))
        .declare(Declaration::multipart());
    check!(kind_of(&empty_multipart) == BuildErrorKind::EmptyMultipart);
}

#[test]
fn body_converter_is_required() {
    let descriptor = method("create")
        .declare(Declaration::post("users"))
        .param(TypeDesc::named("User"), [Declaration::body()]);
    check!(
        kind_of(&descriptor)
            == BuildErrorKind::NoConverterFound {
                purpose: "request body",
                ty: "User".to_string(),
            }
    );
}

// ============================================================================
// Return types
// ============================================================================

#[test]
fn return_type_rules() {
    let base = || method("r").declare(Declaration::get("r"));

    let_assert!(Err(err) = service(&base().returns(TypeDesc::Unit)));
    check!(err.kind == BuildErrorKind::UnitReturnType);

    let_assert!(Err(err) = service(&base().returns(TypeDesc::call(TypeDesc::Wildcard))));
    check!(err.kind == BuildErrorKind::UnresolvableType("Call<?>".to_string()));

    let_assert!(Err(err) = service(&base().returns(TypeDesc::named("User"))));
    check!(err.kind == BuildErrorKind::NoCallAdapterFound("User".to_string()));

    let raw = TypeDesc::call(TypeDesc::named("Response"));
    let_assert!(Err(err) = service(&base().returns(raw)));
    check!(err.kind == BuildErrorKind::InvalidResponseType("Response".to_string()));
    check!(err.to_string().contains("did you mean Bytes?"));

    check!(service(&base().returns(TypeDesc::future(TypeDesc::response(TypeDesc::named("User"))))).is_ok());
}

#[test]
fn head_returns_nothing() {
    let head = || method("exists").declare(Declaration::head("users/1"));

    let_assert!(Err(err) = service(&head().returns(TypeDesc::call(TypeDesc::string()))));
    check!(err.kind == BuildErrorKind::HeadMustReturnVoid);
    check!(err.parameter.is_none());

    check!(service(&head().returns(TypeDesc::call(TypeDesc::Unit))).is_ok());
}

#[test]
fn response_converter_is_required() {
    let descriptor = method("r")
        .declare(Declaration::get("r"))
        .returns(TypeDesc::call(TypeDesc::named("User")));
    let_assert!(
        Err(err) = ServiceMethod::build(
            &descriptor,
            &ConverterResolver::default(),
            &CallAdapterResolver::default()
        )
    );
    check!(
        err.kind
            == BuildErrorKind::NoConverterFound {
                purpose: "response",
                ty: "User".to_string(),
            }
    );
}
