use std::sync::Arc;

use crate::{
    config::{AuthConfig, GatewayConfig},
    db::OrmConn,
    gateway::PaymentGateway,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub gateway: Arc<dyn PaymentGateway>,
    pub auth: AuthConfig,
    pub payments: GatewayConfig,
}
