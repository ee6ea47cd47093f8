use crate::api::attendance::CheckInResponse;
use crate::api::mosque::MosqueListResponse;
use crate::api::participant::{RegisterParticipant, RegisterParticipantResponse};
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::CheckInRequest;
use crate::model::mosque::Mosque;
use crate::model::user::User;
use crate::models::{LoginReqDto, RegisterUserReq};
use utoipa::Modify;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prayer Attendance API",
        version = "1.0.0",
        description = r#"
## Mosque prayer attendance

Kiosks at participating mosques scan a participant's QR card. During the prayer
event each scan is tagged with the prayer whose window contains the scan time,
and points are awarded for the prayer plus an arrival bonus for the first ten
scans at that kiosk.

### Security
- Kiosk check-ins send the shared key in the **X-API-Key** header.
- Dashboard endpoints use **JWT Bearer authentication**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::participant::register_participant,
        crate::api::mosque::list_mosques,

        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::profile
    ),
    components(
        schemas(
            CheckInRequest,
            CheckInResponse,
            RegisterParticipant,
            RegisterParticipantResponse,
            Mosque,
            MosqueListResponse,
            RegisterUserReq,
            LoginReqDto,
            LoginResponse,
            User
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Kiosk QR check-in"),
        (name = "Participant", description = "Participant registration"),
        (name = "Masjid", description = "Participating mosques"),
        (name = "Auth", description = "Dashboard accounts"),
    )
)]
pub struct ApiDoc;

/// Prefix the handler paths above are documented under.
const DOCUMENTED_PREFIX: &str = "/api";

/// OpenAPI document with handler paths moved under the configured `API_PREFIX`.
pub fn api_doc(api_prefix: &str) -> openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let api_prefix = api_prefix.trim_end_matches('/');
    if api_prefix == DOCUMENTED_PREFIX {
        return doc;
    }

    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| match path.strip_prefix(DOCUMENTED_PREFIX) {
            Some(rest) if rest.starts_with('/') => (format!("{}{}", api_prefix, rest), item),
            _ => (path, item),
        })
        .collect();
    doc
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_and_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/absent-qr",
            "/api/register-participant",
            "/api/masjid/{event_id}",
            "/auth/register",
            "/auth/login",
            "/api/users/profile",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
        assert!(schemes.contains_key("api_key"));
    }

    #[test]
    fn paths_follow_configured_prefix() {
        let doc = api_doc("/shollu/");
        assert!(doc.paths.paths.contains_key("/shollu/v1/absent-qr"));
        assert!(doc.paths.paths.contains_key("/shollu/masjid/{event_id}"));
        assert!(!doc.paths.paths.contains_key("/api/v1/absent-qr"));
        // account routes live outside the prefix
        assert!(doc.paths.paths.contains_key("/auth/login"));

        let default_paths: Vec<_> = api_doc("/api").paths.paths.into_keys().collect();
        let documented: Vec<_> = ApiDoc::openapi().paths.paths.into_keys().collect();
        assert_eq!(default_paths, documented);
    }
}
