//! Request dispatch: the per-method resource pipeline as axum endpoints
//!
//! [`api_router`] materializes a registry's route table into an axum
//! [`Router`]. Every request runs the same staged pipeline: resolve the
//! handler, authenticate, preprocess the identifier, parse the payload,
//! preprocess the representation, deserialize, validate input-scope
//! mandatory traits, invoke the connector, validate output-scope mandatory
//! traits, serialize and render. Each stage may short-circuit to an HTTP
//! error; taxonomy errors render with their declared status and
//! representation, unexpected failures are logged and surface as an empty
//! 500.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http::{header, HeaderMap, Method, StatusCode, Uri};
use serde_json::{Map, Value};

use crate::authenticator::{Authenticator as _, RequestInfo};
use crate::connector::{ModelConnector as _, RequestContext};
use crate::error::WebApiError;
use crate::items::ItemsResponse;
use crate::query::QueryArguments;
use crate::registry::{RegisteredHandler, Registry, RouteKind};
use crate::schema::{Instance, SchemaKind};
use crate::traits::Scope;
use crate::transport::{Deserializer as _, Parser as _, Renderer as _, Serializer as _};

/// Build the API router for everything registered in `registry`.
///
/// One collection route and one item route per resource, one route per
/// singleton, all under `{base_path}/api/{version}/` with canonical
/// trailing slashes. The registry is frozen behind the `Arc`; register
/// every connector before calling this.
#[must_use]
pub fn api_router(registry: Arc<Registry>, base_path: &str, version: &str) -> Router {
    let mut router = Router::new();
    for route in registry.api_handlers(base_path, version) {
        let shared = Arc::clone(&registry);
        let name = route.name.clone();
        match route.kind {
            RouteKind::Collection | RouteKind::Singleton => {
                router = router.route(
                    &route.path,
                    any(
                        move |method: Method,
                              uri: Uri,
                              headers: HeaderMap,
                              RawQuery(query): RawQuery,
                              body: Bytes| {
                            collection_endpoint(
                                shared.clone(),
                                name.clone(),
                                method,
                                uri,
                                headers,
                                query,
                                body,
                            )
                        },
                    ),
                );
            }
            RouteKind::Item => {
                router = router.route(
                    &route.path,
                    any(
                        move |Path(identifier): Path<String>,
                              method: Method,
                              uri: Uri,
                              headers: HeaderMap,
                              body: Bytes| {
                            item_endpoint(
                                shared.clone(),
                                name.clone(),
                                identifier,
                                method,
                                uri,
                                headers,
                                body,
                            )
                        },
                    ),
                );
            }
        }
    }
    router
}

/// A pipeline stage short-circuit: either a bare status or a taxonomy
/// error to serialize.
enum Failure {
    Status(StatusCode),
    Api(WebApiError),
}

impl From<WebApiError> for Failure {
    fn from(err: WebApiError) -> Self {
        Self::Api(err)
    }
}

async fn collection_endpoint(
    registry: Arc<Registry>,
    name: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    raw_query: Option<String>,
    body: Bytes,
) -> Response {
    let result = collection_pipeline(
        &registry,
        &name,
        &method,
        &uri,
        &headers,
        raw_query.as_deref(),
        &body,
    )
    .await;
    finish(&registry, &method, &name, None, result)
}

async fn collection_pipeline(
    registry: &Registry,
    name: &str,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    raw_query: Option<&str>,
    body: &[u8],
) -> Result<Response, Failure> {
    let handler = registry
        .lookup(name)
        .ok_or(Failure::Status(StatusCode::NOT_FOUND))?;
    let context = authenticate(registry, method, uri, headers).await;

    match handler.schema.kind() {
        SchemaKind::Resource => match method.as_str() {
            "GET" => collection_get(registry, handler, raw_query, &context).await,
            "POST" => collection_post(registry, handler, uri, body, &context).await,
            _ => Err(Failure::Status(StatusCode::METHOD_NOT_ALLOWED)),
        },
        SchemaKind::Singleton => match method.as_str() {
            "GET" => singleton_get(registry, handler, &context).await,
            "POST" => singleton_post(registry, handler, uri, body, &context).await,
            "PUT" => singleton_put(registry, handler, body, &context).await,
            "DELETE" => singleton_delete(registry, handler, &context).await,
            _ => Err(Failure::Status(StatusCode::METHOD_NOT_ALLOWED)),
        },
        // Fragments are rejected at registration time.
        SchemaKind::Fragment => Err(Failure::Status(StatusCode::NOT_FOUND)),
    }
}

async fn item_endpoint(
    registry: Arc<Registry>,
    name: String,
    identifier: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = item_pipeline(
        &registry,
        &name,
        &identifier,
        &method,
        &uri,
        &headers,
        &body,
    )
    .await;
    finish(&registry, &method, &name, Some(&identifier), result)
}

async fn item_pipeline(
    registry: &Registry,
    name: &str,
    identifier: &str,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, Failure> {
    let handler = registry
        .lookup(name)
        .ok_or(Failure::Status(StatusCode::NOT_FOUND))?;
    let context = authenticate(registry, method, uri, headers).await;

    match method.as_str() {
        "GET" => item_get(registry, handler, identifier, &context).await,
        "POST" => item_post(registry, handler, identifier, &context).await,
        "PUT" => item_put(registry, handler, identifier, body, &context).await,
        "DELETE" => item_delete(registry, handler, identifier, &context).await,
        _ => Err(Failure::Status(StatusCode::METHOD_NOT_ALLOWED)),
    }
}

// ---------------------------------------------------------------------------
// Collection flows
// ---------------------------------------------------------------------------

async fn collection_get(
    registry: &Registry,
    handler: &RegisteredHandler,
    raw_query: Option<&str>,
    context: &RequestContext,
) -> Result<Response, Failure> {
    let args = QueryArguments::parse(raw_query)?;
    let mut response = ItemsResponse::new(Arc::clone(&handler.schema));
    handler
        .connector
        .items(&mut response, &args, context)
        .await?;

    for item in response.items() {
        check_item_output(handler, item)?;
    }

    let representation = registry.transport().serializer.serialize_items_response(&response);
    Ok(rendered_ok(registry, representation))
}

async fn collection_post(
    registry: &Registry,
    handler: &RegisteredHandler,
    uri: &Uri,
    body: &[u8],
    context: &RequestContext,
) -> Result<Response, Failure> {
    let payload = parse_payload(registry, body)?;
    let representation = preprocess_representation(handler, payload)?;
    let mut resource = deserialize(registry, handler, None, Some(&representation))?;
    check_input(&resource)?;

    handler.connector.create(&mut resource, context).await?;

    let Some(identifier) = resource.identifier() else {
        tracing::error!(
            collection = %handler.name,
            "create() completed without assigning an identifier"
        );
        return Err(Failure::Status(StatusCode::INTERNAL_SERVER_ERROR));
    };
    Ok(created(format!("{}{}/", uri.path(), identifier)))
}

// ---------------------------------------------------------------------------
// Item flows
// ---------------------------------------------------------------------------

async fn item_get(
    registry: &Registry,
    handler: &RegisteredHandler,
    identifier: &str,
    context: &RequestContext,
) -> Result<Response, Failure> {
    let identifier = preprocess_identifier(handler, identifier)?;
    let mut resource = deserialize(registry, handler, Some(&identifier), None)?;

    handler.connector.retrieve(&mut resource, context).await?;
    check_resource_output(handler, &resource)?;

    let representation = registry.transport().serializer.serialize_resource(&resource);
    Ok(rendered_ok(registry, representation))
}

/// POST on an item URL is never a create: it resolves to 409 when the
/// resource exists and 404 when it does not.
async fn item_post(
    registry: &Registry,
    handler: &RegisteredHandler,
    identifier: &str,
    context: &RequestContext,
) -> Result<Response, Failure> {
    let identifier = preprocess_identifier(handler, identifier)?;
    let resource = deserialize(registry, handler, Some(&identifier), None)?;

    let exists = handler.connector.exists(&resource, context).await?;
    Err(Failure::Status(if exists {
        StatusCode::CONFLICT
    } else {
        StatusCode::NOT_FOUND
    }))
}

async fn item_put(
    registry: &Registry,
    handler: &RegisteredHandler,
    identifier: &str,
    body: &[u8],
    context: &RequestContext,
) -> Result<Response, Failure> {
    let identifier = preprocess_identifier(handler, identifier)?;
    let payload = parse_payload(registry, body)?;
    let representation = preprocess_representation(handler, payload)?;
    let resource = deserialize(registry, handler, Some(&identifier), Some(&representation))?;
    check_input(&resource)?;

    handler.connector.update(&resource, context).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn item_delete(
    registry: &Registry,
    handler: &RegisteredHandler,
    identifier: &str,
    context: &RequestContext,
) -> Result<Response, Failure> {
    let identifier = preprocess_identifier(handler, identifier)?;
    let resource = deserialize(registry, handler, Some(&identifier), None)?;

    handler.connector.delete(&resource, context).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Singleton flows
// ---------------------------------------------------------------------------

async fn singleton_get(
    registry: &Registry,
    handler: &RegisteredHandler,
    context: &RequestContext,
) -> Result<Response, Failure> {
    let mut resource = deserialize(registry, handler, None, None)?;

    handler.connector.retrieve(&mut resource, context).await?;
    check_resource_output(handler, &resource)?;

    let representation = registry.transport().serializer.serialize_resource(&resource);
    Ok(rendered_ok(registry, representation))
}

async fn singleton_post(
    registry: &Registry,
    handler: &RegisteredHandler,
    uri: &Uri,
    body: &[u8],
    context: &RequestContext,
) -> Result<Response, Failure> {
    let payload = parse_payload(registry, body)?;
    let representation = preprocess_representation(handler, payload)?;
    let mut resource = deserialize(registry, handler, None, Some(&representation))?;
    check_input(&resource)?;

    if handler.connector.exists(&resource, context).await? {
        return Err(Failure::Api(WebApiError::exists()));
    }
    handler.connector.create(&mut resource, context).await?;
    Ok(created(uri.path().to_string()))
}

async fn singleton_put(
    registry: &Registry,
    handler: &RegisteredHandler,
    body: &[u8],
    context: &RequestContext,
) -> Result<Response, Failure> {
    let payload = parse_payload(registry, body)?;
    let representation = preprocess_representation(handler, payload)?;
    let resource = deserialize(registry, handler, None, Some(&representation))?;
    check_input(&resource)?;

    handler.connector.update(&resource, context).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn singleton_delete(
    registry: &Registry,
    handler: &RegisteredHandler,
    context: &RequestContext,
) -> Result<Response, Failure> {
    let resource = deserialize(registry, handler, None, None)?;
    handler.connector.delete(&resource, context).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

async fn authenticate(
    registry: &Registry,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> RequestContext {
    let info = RequestInfo {
        method: method.clone(),
        uri: uri.clone(),
        headers: headers.clone(),
    };
    RequestContext {
        current_user: registry.authenticator().authenticate(&info).await,
    }
}

/// Run the identifier hook. A generic failure means the URL does not
/// resolve to a resource: 404. Taxonomy errors keep their own status.
fn preprocess_identifier(
    handler: &RegisteredHandler,
    identifier: &str,
) -> Result<String, Failure> {
    match handler.connector.preprocess_identifier(identifier) {
        Ok(identifier) => Ok(identifier),
        Err(err) if err.is_internal() => {
            tracing::debug!(
                collection = %handler.name,
                identifier,
                error = %err,
                "identifier rejected by preprocess_identifier"
            );
            Err(Failure::Status(StatusCode::NOT_FOUND))
        }
        Err(err) => Err(Failure::Api(err)),
    }
}

fn parse_payload(
    registry: &Registry,
    body: &[u8],
) -> Result<Option<Map<String, Value>>, Failure> {
    Ok(registry.transport().parser.parse(Some(body))?)
}

/// Run the representation hook. A generic failure becomes a 400: the hook
/// operates on transport-shaped data, so a crash there means the payload
/// did not have the expected shape. A `None` result for a request that
/// carried a payload is a broken hook: 500.
fn preprocess_representation(
    handler: &RegisteredHandler,
    representation: Option<Map<String, Value>>,
) -> Result<Map<String, Value>, Failure> {
    let result = match handler.connector.preprocess_representation(representation) {
        Ok(representation) => representation,
        Err(err) if err.is_internal() => {
            tracing::debug!(
                collection = %handler.name,
                error = %err,
                "generic failure during preprocess_representation"
            );
            return Err(Failure::Api(WebApiError::bad_representation(
                "generic failure during preprocessing",
            )));
        }
        Err(err) => return Err(Failure::Api(err)),
    };

    match result {
        Some(representation) => Ok(representation),
        None => {
            tracing::error!(
                collection = %handler.name,
                "preprocess_representation returned no representation"
            );
            Err(Failure::Status(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn deserialize(
    registry: &Registry,
    handler: &RegisteredHandler,
    identifier: Option<&str>,
    data: Option<&Map<String, Value>>,
) -> Result<Instance, Failure> {
    registry
        .transport()
        .deserializer
        .deserialize(&handler.schema, identifier, data)
        .map_err(|err| Failure::Api(WebApiError::bad_representation(err.to_string())))
}

/// Input-scope mandatory check for create/replace payloads: a violation is
/// the client's fault.
fn check_input(resource: &Instance) -> Result<(), Failure> {
    let missing = resource.mandatory_absents(Scope::Input);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Failure::Api(WebApiError::bad_representation(format!(
            "missing mandatory traits: {}",
            missing.join(", ")
        ))))
    }
}

/// Output-scope check for a retrieved resource: a violation is a server
/// bug, logged in detail and hidden from the client.
fn check_resource_output(
    handler: &RegisteredHandler,
    resource: &Instance,
) -> Result<(), Failure> {
    let missing = resource.mandatory_absents(Scope::Output);
    if missing.is_empty() {
        return Ok(());
    }
    tracing::error!(
        collection = %handler.name,
        identifier = ?resource.identifier(),
        missing = ?missing,
        "connector left mandatory output traits absent"
    );
    Err(Failure::Status(StatusCode::INTERNAL_SERVER_ERROR))
}

/// Output check for one entry of an items response; additionally requires
/// an identifier, since collection entries must be addressable.
fn check_item_output(handler: &RegisteredHandler, item: &Instance) -> Result<(), Failure> {
    if handler.schema.kind() == SchemaKind::Resource && item.identifier().is_none() {
        tracing::error!(
            collection = %handler.name,
            "items() produced an entry without an identifier"
        );
        return Err(Failure::Status(StatusCode::INTERNAL_SERVER_ERROR));
    }
    check_resource_output(handler, item)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn rendered_ok(registry: &Registry, representation: Map<String, Value>) -> Response {
    let transport = registry.transport();
    match transport.renderer.render(Some(&representation)) {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, transport.content_type().to_string())],
            bytes,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn created(location: String) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)]).into_response()
}

fn finish(
    registry: &Registry,
    method: &Method,
    collection: &str,
    identifier: Option<&str>,
    result: Result<Response, Failure>,
) -> Response {
    let failure = match result {
        Ok(response) => return response,
        Err(failure) => failure,
    };

    match failure {
        Failure::Status(status) => status.into_response(),
        Failure::Api(error) => {
            if error.is_internal() {
                tracing::error!(
                    operation = %method,
                    collection,
                    identifier = ?identifier,
                    error = %error,
                    "request failed unexpectedly"
                );
            } else {
                tracing::debug!(
                    operation = %method,
                    collection,
                    identifier = ?identifier,
                    error = %error,
                    "request rejected"
                );
            }

            let status = error.status();
            if error.is_internal() {
                return status.into_response();
            }

            let transport = registry.transport();
            let representation = transport.serializer.serialize_exception(&error);
            match transport.renderer.render(representation.as_ref()) {
                Some(bytes) => (
                    status,
                    [(header::CONTENT_TYPE, transport.content_type().to_string())],
                    bytes,
                )
                    .into_response(),
                None => status.into_response(),
            }
        }
    }
}
