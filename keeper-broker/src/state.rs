use std::sync::Arc;

use keeper_core::{AuthApi, RequestGate, SecretApi};

pub type SharedAuth = Arc<dyn AuthApi>;
pub type SharedSecrets = Arc<dyn SecretApi>;
pub type SharedGate = Arc<RequestGate>;

#[derive(Clone)]
pub struct AppState {
    pub auth: SharedAuth,
    pub secrets: SharedSecrets,
    pub gate: SharedGate,
}

impl AppState {
    pub fn new(auth: SharedAuth, secrets: SharedSecrets, gate: SharedGate) -> Self {
        Self {
            auth,
            secrets,
            gate,
        }
    }
}
