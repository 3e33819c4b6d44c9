use appdata_access::TokenVerifier;
use appdata_storage::{DocumentStore, EntityKey, TransactionalDocumentBackend};
use serde_json::Value;

use crate::{
    AppDataConfig, AppDataError, CollectionHandler, GitHubProxy, Method, PropertyAccessor,
    Request, Response, Route, UsersRegistry,
};

/// The property every app entity keeps its shared payload in
pub const APP_DATA_PROPERTY: &str = "data";

/// The resource layer: classifies each request, checks the caller's level
/// and dispatches to the component that owns the addressed resource.
///
/// ```rust
/// # async fn example() -> Result<(), appdata_service::AppDataError> {
/// use appdata_access::{Identity, Level};
/// use appdata_service::{AppData, AppDataConfig, Method, Request};
/// use appdata_storage::MemoryDocumentBackend;
/// use serde_json::json;
///
/// let app = AppData::new(AppDataConfig::new("acme"), MemoryDocumentBackend::default())?;
/// let alice = Identity::new("alice@example.com", Level::ReadWrite);
///
/// app.handle(
///     Request::new(Method::Put, "user/theme", alice.clone()).with_body(json!("dark")),
/// )
/// .await?;
///
/// let reply = app.handle(Request::new(Method::Get, "user/theme", alice)).await?;
/// assert_eq!(reply.body, Some(json!("dark")));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AppData<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    config: AppDataConfig,
    properties: PropertyAccessor<Backend>,
    registry: UsersRegistry<Backend>,
    collections: CollectionHandler<Backend>,
    proxy: GitHubProxy,
    verifier: Option<TokenVerifier>,
}

impl<Backend> AppData<Backend>
where
    Backend: TransactionalDocumentBackend,
{
    /// Assembles the service over `backend`
    pub fn new(config: AppDataConfig, backend: Backend) -> Result<Self, AppDataError> {
        if config.group.is_empty() {
            return Err(AppDataError::Configuration(
                "the group namespace must not be empty".into(),
            ));
        }

        let store = DocumentStore::new(backend).with_policy(config.update_policy.clone());

        Ok(Self {
            properties: PropertyAccessor::new(store.clone()),
            registry: UsersRegistry::new(store.clone(), &config.group),
            collections: CollectionHandler::new(store),
            proxy: GitHubProxy::new(&config.github)?,
            verifier: config.secret.as_ref().map(TokenVerifier::new),
            config,
        })
    }

    /// Verifies the `Authorization` header and handles the request on behalf
    /// of the identity it carries
    pub async fn handle_bearer(
        &self,
        authorization: Option<&str>,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, AppDataError> {
        let verifier = self.verifier.as_ref().ok_or_else(|| {
            AppDataError::Configuration("no token secret is configured".into())
        })?;

        let identity = verifier.verify_header(authorization).map_err(|error| {
            tracing::info!(%error, %method, path, "rejected credential");
            AppDataError::from(error)
        })?;

        self.handle(Request {
            method,
            path: path.to_owned(),
            identity,
            body,
        })
        .await
    }

    /// Handles one request from an already verified identity
    pub async fn handle(&self, request: Request) -> Result<Response, AppDataError> {
        let method = request.method;
        let path = request.path.clone();
        let email = request.identity.email.clone();

        let result = self.dispatch(request).await;

        match &result {
            Ok(_) => tracing::debug!(%method, %path, %email, "handled"),
            Err(error) => tracing::info!(
                %method,
                %path,
                %email,
                status = error.status(),
                %error,
                "request failed"
            ),
        }

        result
    }

    async fn dispatch(&self, request: Request) -> Result<Response, AppDataError> {
        let Request {
            method,
            path,
            identity,
            body,
        } = request;

        let route = Route::parse(&path, &self.config.collections)?;
        if let Some(required) = route.required_level(method) {
            if !identity.is_authorized(required) {
                return Err(AppDataError::Forbidden { required });
            }
        }

        tracing::debug!(route = route.name(), %method, email = %identity.email, "dispatching");

        match route {
            Route::UserProperty { property } => {
                let key = EntityKey::named(&self.config.group, &identity.email);
                self.property(&key, &property, method, body).await
            }
            Route::UserCollection { kind, id } => {
                let owner = EntityKey::named(&self.config.group, &identity.email);
                self.collections
                    .handle(&owner, &kind, id, method, body)
                    .await
            }
            Route::AppProperty { app } => {
                let key = EntityKey::named(&self.config.group, &app);
                self.property(&key, APP_DATA_PROPERTY, method, body).await
            }
            Route::UsersRegistry => match method {
                Method::Get => Ok(Response::json(self.registry.get().await?)),
                Method::Post | Method::Put => {
                    self.registry.merge(body).await?;
                    Ok(Response::empty())
                }
                Method::Delete => {
                    self.registry.remove(body).await?;
                    Ok(Response::empty())
                }
            },
            Route::GitProxy { organization } => match method {
                Method::Get => Ok(Response::json(self.proxy.organization(&organization).await?)),
                method => Err(AppDataError::MethodNotAllowed {
                    method,
                    resource: format!("gitinfo/{organization}"),
                }),
            },
            Route::Unknown(segment) => Err(AppDataError::UnknownRoute(segment)),
        }
    }

    async fn property(
        &self,
        key: &EntityKey,
        name: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Response, AppDataError> {
        match method {
            Method::Get => Ok(Response::json(self.properties.get(key, name).await?)),
            _ => {
                self.properties.set(key, name, body, method).await?;
                Ok(Response::empty())
            }
        }
    }
}
