use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use docflow_core::{ClientId, TenantId};

/// Contact details copied onto generated documents (e.g. delivery notes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Tenant-isolated client lookup.
pub trait ClientDirectory: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: ClientId) -> Option<Client>;
    fn upsert(&self, tenant_id: TenantId, client: Client);
    fn list(&self, tenant_id: TenantId) -> Vec<Client>;
}

impl<S> ClientDirectory for Arc<S>
where
    S: ClientDirectory + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: ClientId) -> Option<Client> {
        (**self).get(tenant_id, id)
    }

    fn upsert(&self, tenant_id: TenantId, client: Client) {
        (**self).upsert(tenant_id, client)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<Client> {
        (**self).list(tenant_id)
    }
}

/// In-memory client directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryClientDirectory {
    inner: RwLock<HashMap<(TenantId, ClientId), Client>>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientDirectory for InMemoryClientDirectory {
    fn get(&self, tenant_id: TenantId, id: ClientId) -> Option<Client> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, id)).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, client: Client) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, client.id), client);
        }
    }

    fn list(&self, tenant_id: TenantId) -> Vec<Client> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut clients: Vec<Client> = map
            .iter()
            .filter(|((t, _), _)| *t == tenant_id)
            .map(|(_, c)| c.clone())
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        clients
    }
}
