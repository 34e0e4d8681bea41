//! Shared test utilities: an in-process fake adapter with call counters.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use osok_core::error::Result;
use osok_core::{
    AdapterError, Created, LifecycleClass, Provisioning, RemoteResource, ResourceAdapter,
};

#[derive(Debug, Clone)]
pub struct FakeSpec {
    pub id: Option<String>,
    pub name: String,
}

impl FakeSpec {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }

    pub fn bound(id: &str, name: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: name.to_string(),
        }
    }
}

/// What the fake provider does on create.
#[derive(Debug, Clone)]
pub enum CreateMode {
    /// Return the new resource directly in the given state.
    Return(&'static str),
    /// Accept asynchronously. `id_known` controls whether the identifier is
    /// returned, `visible` whether the resource can be read yet.
    Accepted {
        id_known: bool,
        visible: bool,
        state: &'static str,
    },
    Fail(AdapterError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub lookup: u32,
    pub get: u32,
    pub create: u32,
    pub update: u32,
    pub delete: u32,
    pub cleanup: u32,
    pub publish: u32,
}

#[derive(Debug)]
pub struct FakeState {
    /// Remote resources in provider list order.
    pub resources: Vec<RemoteResource>,
    pub create_mode: CreateMode,
    pub lookup_error: Option<AdapterError>,
    pub get_error: Option<AdapterError>,
    pub update_error: Option<AdapterError>,
    /// Whether a successful update reports that it sent changes.
    pub update_changes: bool,
    pub delete_error: Option<AdapterError>,
    pub cleanup_error: Option<AdapterError>,
    pub publish_error: Option<AdapterError>,
    /// Lifecycle states applied to successive gets.
    pub get_script: VecDeque<&'static str>,
    pub calls: Calls,
    next_id: u32,
}

pub struct FakeAdapter {
    state: Mutex<FakeState>,
    provisioning: Provisioning,
}

impl FakeAdapter {
    pub fn new(create_mode: CreateMode) -> Arc<Self> {
        Self::with_provisioning(create_mode, Provisioning::Requeue)
    }

    pub fn with_provisioning(create_mode: CreateMode, provisioning: Provisioning) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                resources: Vec::new(),
                create_mode,
                lookup_error: None,
                get_error: None,
                update_error: None,
                update_changes: false,
                delete_error: None,
                cleanup_error: None,
                publish_error: None,
                get_script: VecDeque::new(),
                calls: Calls::default(),
                next_id: 0,
            }),
            provisioning,
        })
    }

    pub fn seed(&self, id: &str, name: &str, state: &str) {
        self.state
            .lock()
            .unwrap()
            .resources
            .push(RemoteResource::new(id, Some(name), state));
    }

    pub fn set_state(&self, id: &str, lifecycle_state: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.resources.iter_mut().find(|r| r.id == id) {
            r.lifecycle_state = lifecycle_state.to_string();
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    fn new_id(state: &mut FakeState) -> String {
        state.next_id += 1;
        format!("ocid1.fake.oc1..{:04}", state.next_id)
    }
}

pub fn classify_label(label: &str) -> LifecycleClass {
    match label {
        "AVAILABLE" => LifecycleClass::TerminalOk,
        "FAILED" | "TERMINATED" => LifecycleClass::TerminalFailed,
        _ => LifecycleClass::Transient,
    }
}

#[async_trait]
impl ResourceAdapter for FakeAdapter {
    type Spec = FakeSpec;

    fn kind(&self) -> &'static str {
        "Fake"
    }

    fn bound_id<'a>(&self, spec: &'a FakeSpec) -> Option<&'a str> {
        spec.id.as_deref()
    }

    fn display_name<'a>(&self, spec: &'a FakeSpec) -> &'a str {
        &spec.name
    }

    async fn lookup_by_name(&self, spec: &FakeSpec) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.lookup += 1;
        if let Some(e) = state.lookup_error.clone() {
            return Err(e);
        }
        Ok(state
            .resources
            .iter()
            .filter(|r| r.display_name.as_deref() == Some(spec.name.as_str()))
            .find(|r| classify_label(&r.lifecycle_state).is_bindable())
            .map(|r| r.id.clone()))
    }

    async fn get(&self, id: &str) -> Result<RemoteResource> {
        let mut state = self.state.lock().unwrap();
        state.calls.get += 1;
        if let Some(e) = state.get_error.clone() {
            return Err(e);
        }
        let next = state.get_script.pop_front();
        let resource = state
            .resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AdapterError::NotFound(id.to_string()))?;
        if let Some(label) = next {
            resource.lifecycle_state = label.to_string();
        }
        Ok(resource.clone())
    }

    async fn create(&self, spec: &FakeSpec) -> Result<Created> {
        let mut state = self.state.lock().unwrap();
        state.calls.create += 1;
        match state.create_mode.clone() {
            CreateMode::Return(label) => {
                let id = Self::new_id(&mut state);
                let resource = RemoteResource::new(&id, Some(&spec.name), label);
                state.resources.push(resource.clone());
                Ok(Created::Resource(resource))
            }
            CreateMode::Accepted {
                id_known,
                visible,
                state: label,
            } => {
                let id = Self::new_id(&mut state);
                if visible {
                    state
                        .resources
                        .push(RemoteResource::new(&id, Some(&spec.name), label));
                }
                Ok(Created::Accepted {
                    id: id_known.then_some(id),
                })
            }
            CreateMode::Fail(e) => Err(e),
        }
    }

    async fn update(&self, _current: &RemoteResource, _spec: &FakeSpec) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.update += 1;
        match state.update_error.clone() {
            Some(e) => Err(e),
            None => Ok(state.update_changes),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        if let Some(e) = state.delete_error.clone() {
            return Err(e);
        }
        let before = state.resources.len();
        state.resources.retain(|r| r.id != id);
        if state.resources.len() == before {
            return Err(AdapterError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn classify(&self, resource: &RemoteResource) -> LifecycleClass {
        classify_label(&resource.lifecycle_state)
    }

    fn provisioning(&self) -> Provisioning {
        self.provisioning
    }

    async fn publish(&self, _spec: &FakeSpec, _resource: &RemoteResource) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.publish += 1;
        match state.publish_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn cleanup_secondary(&self, _id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.cleanup += 1;
        match state.cleanup_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
