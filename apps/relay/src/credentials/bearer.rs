use async_trait::async_trait;

use super::{Credential, CredentialError, CredentialSource, RequestContext};

/// Browser code keeps the token in local storage and sends it on the
/// same-origin call as `Authorization: Bearer <token>`. The relay passes it on.
pub struct BearerHeaderSource;

#[async_trait]
impl CredentialSource for BearerHeaderSource {
    fn name(&self) -> &'static str {
        "bearer"
    }

    async fn credential(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Credential>, CredentialError> {
        Ok(ctx.authorization().and_then(strip_bearer).and_then(Credential::new))
    }
}

/// Scheme match is case-insensitive, as with any HTTP auth scheme.
fn strip_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}
