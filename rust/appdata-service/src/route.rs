use appdata_access::Level;

use crate::{AppDataError, Method, USERS_REGISTRY};

/// The closed set of resources a request path can address, decided once per
/// request by [Route::parse]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `user/<property>`: one named property on the caller's user entity
    UserProperty {
        /// The property name
        property: String,
    },
    /// `user/<collection>[/<id>]`: a registered sub-collection owned by the
    /// caller, or one item in it
    UserCollection {
        /// The collection keyword
        kind: String,
        /// The addressed item, if any
        id: Option<u64>,
    },
    /// `data/<app>`: the shared payload of one application. App entities
    /// share the group with the users registry, so [USERS_REGISTRY] is not
    /// a valid app id.
    AppProperty {
        /// The application id
        app: String,
    },
    /// `users`: the registry of users and their levels
    UsersRegistry,
    /// `gitinfo/<organization>`: the issue-tracker pass-through
    GitProxy {
        /// The organization to describe
        organization: String,
    },
    /// Anything else; carries the unrecognized first segment
    Unknown(String),
}

fn parse_item_id(segment: &str) -> Result<u64, AppDataError> {
    match segment.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppDataError::InvalidItemId(segment.to_owned())),
    }
}

fn required<'a>(segment: Option<&'a str>, name: &'static str) -> Result<&'a str, AppDataError> {
    segment
        .filter(|segment| !segment.is_empty())
        .ok_or(AppDataError::MissingSegment(name))
}

impl Route {
    /// Classifies a slash-delimited path. `collections` lists the keywords
    /// that turn `user/<keyword>` into a collection route.
    pub fn parse(path: &str, collections: &[String]) -> Result<Route, AppDataError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(AppDataError::EmptyPath);
        }

        let mut segments = path.split('/');
        let first = segments.next().unwrap_or_default();

        Ok(match first {
            "user" => {
                let name = required(segments.next(), "property")?;

                if collections.iter().any(|collection| collection == name) {
                    let id = match segments.next() {
                        Some("") | None => None,
                        Some(id) => Some(parse_item_id(id)?),
                    };
                    if segments.next().is_some() {
                        return Err(AppDataError::UnknownRoute(path.to_owned()));
                    }
                    Route::UserCollection {
                        kind: name.to_owned(),
                        id,
                    }
                } else {
                    Route::UserProperty {
                        property: name.to_owned(),
                    }
                }
            }
            "users" => Route::UsersRegistry,
            "data" => match required(segments.next(), "application")? {
                USERS_REGISTRY => {
                    return Err(AppDataError::ReservedName(USERS_REGISTRY.to_owned()));
                }
                app => Route::AppProperty {
                    app: app.to_owned(),
                },
            },
            "gitinfo" => Route::GitProxy {
                organization: required(segments.next(), "organization")?.to_owned(),
            },
            other => Route::Unknown(other.to_owned()),
        })
    }

    /// The least level that may issue `method` against this route, or `None`
    /// for a route that addresses nothing
    pub fn required_level(&self, method: Method) -> Option<Level> {
        Some(match (self, method) {
            (Route::Unknown(_), _) => return None,
            (Route::UsersRegistry, _) => Level::Admin,
            (Route::AppProperty { .. }, method) if method.is_mutation() => Level::Admin,
            (Route::UserProperty { .. } | Route::UserCollection { .. }, method)
                if method.is_mutation() =>
            {
                Level::ReadWrite
            }
            _ => Level::ReadOnly,
        })
    }

    /// A short name for log fields
    pub fn name(&self) -> &'static str {
        match self {
            Route::UserProperty { .. } => "user-property",
            Route::UserCollection { .. } => "user-collection",
            Route::AppProperty { .. } => "app-property",
            Route::UsersRegistry => "users-registry",
            Route::GitProxy { .. } => "git-proxy",
            Route::Unknown(_) => "unknown",
        }
    }
}
