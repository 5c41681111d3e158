// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - In-memory collaborators for unit tests

use crate::identity::{AuthEvent, IdentityProvider};
use crate::store::PropertyStore;
use crate::types::{AppError, Property, Session};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Semaphore};

pub fn session_for(user_id: &str) -> Session {
    Session {
        access_token: format!("token-{}", user_id),
        refresh_token: String::new(),
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        expires_at: 0,
    }
}

pub fn sample_property(id: &str, title: &str) -> Property {
    Property {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        price: 1000.0,
        price_period: None,
        property_type: "house".to_string(),
        listing_type: "sale".to_string(),
        bedrooms: 3,
        bathrooms: 2,
        square_feet: 1500,
        address: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        state: None,
        country: "USA".to_string(),
        latitude: None,
        longitude: None,
        images: Vec::new(),
        featured: false,
        rating: 0.0,
        review_count: 0,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_at: None,
    }
}

#[derive(Default)]
struct StoreData {
    saved: HashMap<String, Vec<String>>,
    viewed: HashMap<String, Vec<String>>,
    inquiries: HashMap<String, Vec<String>>,
    properties: Vec<Property>,
    failing: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
}

/// Property store backed by maps, with per-operation failure injection and
/// gates that hold an operation until released
#[derive(Default)]
pub struct FakeStore {
    data: Mutex<StoreData>,
    gates: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
}

impl FakeStore {
    pub fn seed_saved(&self, user_id: &str, property_ids: &[&str]) {
        self.data.lock().unwrap().saved.insert(
            user_id.to_string(),
            property_ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn seed_viewed(&self, user_id: &str, ids: &[&str]) {
        self.data.lock().unwrap().viewed.insert(
            user_id.to_string(),
            ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn seed_inquiries(&self, user_id: &str, ids: &[&str]) {
        self.data.lock().unwrap().inquiries.insert(
            user_id.to_string(),
            ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn set_properties(&self, properties: Vec<Property>) {
        self.data.lock().unwrap().properties = properties;
    }

    pub fn saved_links(&self, user_id: &str) -> Vec<String> {
        self.data
            .lock()
            .unwrap()
            .saved
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail(&self, op: &'static str) {
        self.data.lock().unwrap().failing.insert(op);
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.data.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.data.lock().unwrap().calls.values().sum()
    }

    /// Hold `op` until `release` is called
    pub fn hold(&self, op: &'static str) {
        self.gates
            .lock()
            .unwrap()
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: &'static str) {
        if let Some(gate) = self.gates.lock().unwrap().get(op) {
            gate.add_permits(1);
        }
    }

    async fn enter(&self, op: &'static str) -> Result<(), AppError> {
        *self.data.lock().unwrap().calls.entry(op).or_default() += 1;

        let gate = self.gates.lock().unwrap().get(op).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.data.lock().unwrap().failing.contains(op) {
            return Err(AppError::Backend {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for FakeStore {
    async fn saved_property_ids(&self, session: &Session) -> Result<Vec<String>, AppError> {
        self.enter("saved_property_ids").await?;
        Ok(self.saved_links(&session.user_id))
    }

    async fn insert_saved(&self, session: &Session, property_id: &str) -> Result<(), AppError> {
        self.enter("insert_saved").await?;
        let mut data = self.data.lock().unwrap();
        let links = data.saved.entry(session.user_id.clone()).or_default();
        if links.iter().any(|id| id == property_id) {
            return Err(AppError::Backend {
                status: 409,
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }
        links.push(property_id.to_string());
        Ok(())
    }

    async fn delete_saved(&self, session: &Session, property_id: &str) -> Result<(), AppError> {
        self.enter("delete_saved").await?;
        let mut data = self.data.lock().unwrap();
        if let Some(links) = data.saved.get_mut(&session.user_id) {
            links.retain(|id| id != property_id);
        }
        Ok(())
    }

    async fn viewed_ids(&self, session: &Session) -> Result<Vec<String>, AppError> {
        self.enter("viewed_ids").await?;
        let data = self.data.lock().unwrap();
        Ok(data.viewed.get(&session.user_id).cloned().unwrap_or_default())
    }

    async fn inquiry_ids(&self, session: &Session) -> Result<Vec<String>, AppError> {
        self.enter("inquiry_ids").await?;
        let data = self.data.lock().unwrap();
        Ok(data
            .inquiries
            .get(&session.user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn properties_by_ids(&self, ids: &[String]) -> Result<Vec<Property>, AppError> {
        self.enter("properties_by_ids").await?;
        let data = self.data.lock().unwrap();
        Ok(data
            .properties
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_properties(&self) -> Result<Vec<Property>, AppError> {
        self.enter("list_properties").await?;
        Ok(self.data.lock().unwrap().properties.clone())
    }
}

/// Identity provider holding a session in memory
pub struct FakeIdentity {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    fail_sign_out: Mutex<bool>,
    sign_out_calls: Mutex<usize>,
    current_session_calls: Mutex<usize>,
}

impl FakeIdentity {
    pub fn new(session: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(session),
            events,
            fail_sign_out: Mutex::new(false),
            sign_out_calls: Mutex::new(0),
            current_session_calls: Mutex::new(0),
        }
    }

    /// Change the session and notify subscribers
    pub fn emit(&self, event: AuthEvent) {
        *self.session.lock().unwrap() = event.session.clone();
        let _ = self.events.send(event);
    }

    pub fn fail_sign_out(&self) {
        *self.fail_sign_out.lock().unwrap() = true;
    }

    pub fn sign_out_calls(&self) -> usize {
        *self.sign_out_calls.lock().unwrap()
    }

    pub fn current_session_calls(&self) -> usize {
        *self.current_session_calls.lock().unwrap()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_session(&self) -> Result<Option<Session>, AppError> {
        *self.current_session_calls.lock().unwrap() += 1;
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        *self.sign_out_calls.lock().unwrap() += 1;
        if *self.fail_sign_out.lock().unwrap() {
            return Err(AppError::Auth("logout endpoint unavailable".to_string()));
        }
        self.emit(AuthEvent::signed_out());
        Ok(())
    }
}
