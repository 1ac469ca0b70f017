//! Device registry — the in-memory device map and its persistence.
//!
//! Every mutation runs against a draft copy of the map and is committed only
//! after the store accepted the whole new registry. The map lock is held
//! across the persist call, so whole-file rewrites never interleave.

use std::collections::BTreeMap;

use omnihub_domain::device::Device;
use omnihub_domain::error::{NotFoundError, OmniHubError};
use omnihub_domain::id::DeviceId;
use tokio::sync::Mutex;

use crate::ports::DeviceStore;

pub struct DeviceRegistry<S> {
    store: S,
    devices: Mutex<BTreeMap<DeviceId, Device>>,
}

impl<S: DeviceStore> DeviceRegistry<S> {
    /// Load the registry from `store`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    pub async fn open(store: S) -> Result<Self, OmniHubError> {
        let devices = store.load().await?;
        tracing::debug!(count = devices.len(), "device registry loaded");
        Ok(Self {
            store,
            devices: Mutex::new(
                devices
                    .into_iter()
                    .map(|device| (device.id.clone(), device))
                    .collect(),
            ),
        })
    }

    /// All devices ordered by id.
    pub async fn list(&self) -> Vec<Device> {
        self.devices.lock().await.values().cloned().collect()
    }

    pub async fn find(&self, id: &str) -> Option<Device> {
        self.devices.lock().await.get(id).cloned()
    }

    /// Look up a device, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] when no device with `id` exists.
    pub async fn get(&self, id: &str) -> Result<Device, OmniHubError> {
        self.find(id).await.ok_or_else(|| not_found(id))
    }

    /// Mutate one device and persist the registry.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown ids, the closure's error,
    /// or a storage error. Nothing changes in memory when any of them occurs.
    pub async fn update<T>(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Device) -> Result<T, OmniHubError>,
    ) -> Result<T, OmniHubError> {
        self.mutate(|devices| {
            let device = devices.get_mut(id).ok_or_else(|| not_found(id))?;
            apply(device)
        })
        .await
    }

    /// Mutate the whole map and persist it as one unit.
    ///
    /// # Errors
    ///
    /// Returns the closure's error or a storage error; in both cases the
    /// in-memory map is left untouched.
    pub async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut BTreeMap<DeviceId, Device>) -> Result<T, OmniHubError>,
    ) -> Result<T, OmniHubError> {
        let mut devices = self.devices.lock().await;
        let mut draft = devices.clone();
        let value = apply(&mut draft)?;
        self.store.persist(draft.values().cloned().collect()).await?;
        *devices = draft;
        Ok(value)
    }
}

fn not_found(id: &str) -> OmniHubError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fakes::{FakeStore, device};
    use omnihub_domain::error::ValidationError;

    #[tokio::test]
    async fn should_load_devices_from_store_when_opened() {
        let store = FakeStore::with(vec![device("tv"), device("lamp")]);
        let registry = DeviceRegistry::open(store).await.unwrap();

        let ids: Vec<_> = registry
            .list()
            .await
            .into_iter()
            .map(|device| device.id.to_string())
            .collect();
        assert_eq!(ids, vec!["lamp", "tv"]);
    }

    #[tokio::test]
    async fn should_return_not_found_when_device_missing() {
        let registry = DeviceRegistry::open(FakeStore::default()).await.unwrap();
        let err = registry.get("ghost").await.unwrap_err();
        assert!(matches!(err, OmniHubError::NotFound(ref e) if e.entity == "Device"));
    }

    #[tokio::test]
    async fn should_persist_after_update() {
        let store = FakeStore::with(vec![device("tv")]);
        let registry = DeviceRegistry::open(store.clone()).await.unwrap();

        registry
            .update("tv", |device| {
                device.room = "Den".to_string();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.persist_count(), 1);
        assert_eq!(store.saved()[0].room, "Den");
        assert_eq!(registry.get("tv").await.unwrap().room, "Den");
    }

    #[tokio::test]
    async fn should_leave_map_untouched_when_closure_fails() {
        let store = FakeStore::with(vec![device("tv")]);
        let registry = DeviceRegistry::open(store.clone()).await.unwrap();

        let err = registry
            .update("tv", |device| -> Result<(), OmniHubError> {
                device.room = "Den".to_string();
                Err(ValidationError::MissingAddress.into())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, OmniHubError::Validation(_)));
        assert_eq!(store.persist_count(), 0);
        assert_ne!(registry.get("tv").await.unwrap().room, "Den");
    }

    #[tokio::test]
    async fn should_leave_map_untouched_when_persist_fails() {
        let store = FakeStore::with(vec![device("tv")]);
        store.fail_persist(true);
        let registry = DeviceRegistry::open(store.clone()).await.unwrap();

        let err = registry
            .update("tv", |device| {
                device.room = "Den".to_string();
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, OmniHubError::Storage(_)));
        assert_ne!(registry.get("tv").await.unwrap().room, "Den");
    }

    #[tokio::test]
    async fn should_serialize_concurrent_mutations() {
        let store = FakeStore::with(vec![device("a"), device("b")]);
        let registry = std::sync::Arc::new(DeviceRegistry::open(store.clone()).await.unwrap());

        let left = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .update("a", |device| {
                        device.room = "Left".to_string();
                        Ok(())
                    })
                    .await
            })
        };
        let right = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .update("b", |device| {
                        device.room = "Right".to_string();
                        Ok(())
                    })
                    .await
            })
        };
        left.await.unwrap().unwrap();
        right.await.unwrap().unwrap();

        let saved = store.saved();
        assert_eq!(saved.iter().find(|d| d.id.as_str() == "a").unwrap().room, "Left");
        assert_eq!(saved.iter().find(|d| d.id.as_str() == "b").unwrap().room, "Right");
    }
}
