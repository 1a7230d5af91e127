use super::{AuthorizedClient, OAuth2Error};
use crate::cache::{Cache, CacheBackend};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::sync::Arc;

/// Principal every client is stored under by [`GlobalPrincipalAuthorizedClientService`]
pub const GLOBAL_PRINCIPAL: &str = "global-system-principal";

/// Store of authorized clients keyed by registration id and principal name.
#[async_trait]
pub trait AuthorizedClientService: Send + Sync {
    async fn load(
        &self,
        registration_id: &str,
        principal: &str,
    ) -> Result<Option<AuthorizedClient>, OAuth2Error>;

    async fn save(&self, client: &AuthorizedClient, principal: &str) -> Result<(), OAuth2Error>;

    async fn remove(&self, registration_id: &str, principal: &str) -> Result<(), OAuth2Error>;
}

#[async_trait]
impl<S: AuthorizedClientService + ?Sized> AuthorizedClientService for Arc<S> {
    async fn load(
        &self,
        registration_id: &str,
        principal: &str,
    ) -> Result<Option<AuthorizedClient>, OAuth2Error> {
        (**self).load(registration_id, principal).await
    }

    async fn save(&self, client: &AuthorizedClient, principal: &str) -> Result<(), OAuth2Error> {
        (**self).save(client, principal).await
    }

    async fn remove(&self, registration_id: &str, principal: &str) -> Result<(), OAuth2Error> {
        (**self).remove(registration_id, principal).await
    }
}

/// Keeps authorized clients in the configured cache backend.
#[derive(Clone)]
pub struct CacheAuthorizedClientService {
    cache: Cache,
}

impl CacheAuthorizedClientService {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn key(registration_id: &str, principal: &str) -> String {
        format!("oauth2_client:{registration_id}:{principal}")
    }
}

#[async_trait]
impl AuthorizedClientService for CacheAuthorizedClientService {
    async fn load(
        &self,
        registration_id: &str,
        principal: &str,
    ) -> Result<Option<AuthorizedClient>, OAuth2Error> {
        let client = self.cache.get(&Self::key(registration_id, principal)).await?;
        Ok(client)
    }

    async fn save(&self, client: &AuthorizedClient, principal: &str) -> Result<(), OAuth2Error> {
        let key = Self::key(&client.registration_id, principal);
        debug!("Caching authorized client under {}", key);
        let expires_in = client.access_token.expires_in(Utc::now());
        self.cache.set(&key, client, expires_in).await?;
        Ok(())
    }

    async fn remove(&self, registration_id: &str, principal: &str) -> Result<(), OAuth2Error> {
        self.cache
            .delete(&Self::key(registration_id, principal))
            .await?;
        Ok(())
    }
}

/// Ignores the caller's principal and delegates using [`GLOBAL_PRINCIPAL`],
/// so one system token per registration is shared by all users.
#[derive(Clone)]
pub struct GlobalPrincipalAuthorizedClientService<S> {
    delegate: S,
}

impl<S: AuthorizedClientService> GlobalPrincipalAuthorizedClientService<S> {
    pub fn new(delegate: S) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl<S: AuthorizedClientService> AuthorizedClientService for GlobalPrincipalAuthorizedClientService<S> {
    async fn load(
        &self,
        registration_id: &str,
        _principal: &str,
    ) -> Result<Option<AuthorizedClient>, OAuth2Error> {
        self.delegate.load(registration_id, GLOBAL_PRINCIPAL).await
    }

    async fn save(&self, client: &AuthorizedClient, _principal: &str) -> Result<(), OAuth2Error> {
        self.delegate.save(client, GLOBAL_PRINCIPAL).await
    }

    async fn remove(&self, registration_id: &str, _principal: &str) -> Result<(), OAuth2Error> {
        self.delegate.remove(registration_id, GLOBAL_PRINCIPAL).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCache;
    use crate::oauth2::tests::access_token;
    use std::sync::Mutex;

    /// Records the principal each call was made with
    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<(&'static str, String, String)>>,
        fail: bool,
    }

    impl RecordingService {
        fn record(
            &self,
            op: &'static str,
            registration_id: &str,
            principal: &str,
        ) -> Result<(), OAuth2Error> {
            self.calls.lock().unwrap().push((
                op,
                registration_id.to_string(),
                principal.to_string(),
            ));
            if self.fail {
                Err(OAuth2Error::TokenRequest("delegate failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AuthorizedClientService for RecordingService {
        async fn load(
            &self,
            registration_id: &str,
            principal: &str,
        ) -> Result<Option<AuthorizedClient>, OAuth2Error> {
            self.record("load", registration_id, principal)?;
            Ok(None)
        }

        async fn save(&self, client: &AuthorizedClient, principal: &str) -> Result<(), OAuth2Error> {
            self.record("save", &client.registration_id, principal)
        }

        async fn remove(&self, registration_id: &str, principal: &str) -> Result<(), OAuth2Error> {
            self.record("remove", registration_id, principal)
        }
    }

    fn client(registration_id: &str, principal: &str) -> AuthorizedClient {
        AuthorizedClient {
            registration_id: registration_id.to_string(),
            principal_name: principal.to_string(),
            access_token: access_token("token", chrono::Duration::hours(1)),
        }
    }

    fn in_memory() -> CacheAuthorizedClientService {
        CacheAuthorizedClientService::new(Cache::InMemory(InMemoryCache::new(60, 16).unwrap()))
    }

    #[tokio::test]
    async fn test_global_principal_replaces_caller_principal() {
        let delegate = Arc::new(RecordingService::default());
        let service = GlobalPrincipalAuthorizedClientService::new(delegate.clone());

        service.load("prison-api", "bob").await.unwrap();
        service.save(&client("prison-api", "bob"), "bob").await.unwrap();
        service.remove("prison-api", "alice").await.unwrap();

        let calls = delegate.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for (_, registration_id, principal) in calls.iter() {
            assert_eq!(registration_id, "prison-api");
            assert_eq!(principal, GLOBAL_PRINCIPAL);
        }
        assert_eq!(
            calls.iter().map(|(op, _, _)| *op).collect::<Vec<_>>(),
            ["load", "save", "remove"]
        );
    }

    #[tokio::test]
    async fn test_global_principal_propagates_delegate_errors() {
        let delegate = RecordingService {
            fail: true,
            ..Default::default()
        };
        let service = GlobalPrincipalAuthorizedClientService::new(delegate);
        let err = service.load("prison-api", "bob").await.unwrap_err();
        assert_eq!(err.to_string(), "Token request failed: delegate failed");
    }

    #[tokio::test]
    async fn test_clients_shared_across_users() {
        let service = GlobalPrincipalAuthorizedClientService::new(in_memory());
        service.save(&client("prison-api", "bob"), "bob").await.unwrap();

        let loaded = service.load("prison-api", "alice").await.unwrap().unwrap();
        assert_eq!(loaded.principal_name, "bob");
        assert!(service.load("other-api", "alice").await.unwrap().is_none());

        service.remove("prison-api", "carol").await.unwrap();
        assert!(service.load("prison-api", "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_service_keys_by_principal() {
        let service = in_memory();
        service.save(&client("prison-api", "bob"), "bob").await.unwrap();
        assert!(service.load("prison-api", "bob").await.unwrap().is_some());
        assert!(service.load("prison-api", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_client_is_not_stored() {
        let service = in_memory();
        let mut expired = client("prison-api", "bob");
        expired.access_token = access_token("token", chrono::Duration::seconds(-5));
        service.save(&expired, "bob").await.unwrap();
        assert!(service.load("prison-api", "bob").await.unwrap().is_none());
    }
}
