use std::sync::Arc;

use crate::application::checkout::CheckoutService;
use crate::application::order_service::OrderService;
use crate::application::reconciler::CallbackReconciler;
use crate::application::user_service::UserService;
use crate::checksum::MerchantKey;
use crate::config::RedirectConfig;
use crate::domain::payment::TransitionPolicy;
use crate::domain::ports::{OrderRepository, PaymentGateway, PriceAuthority, UserRepository};

/// Explicitly constructed collaborators shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub checkout: CheckoutService,
    pub reconciler: CallbackReconciler,
    pub users: UserService,
    pub redirects: RedirectConfig,
}

/// Store and gateway handles the services are wired from.
pub struct Ports {
    pub prices: Arc<dyn PriceAuthority>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(
        ports: Ports,
        merchant_key: MerchantKey,
        policy: TransitionPolicy,
        redirects: RedirectConfig,
    ) -> Self {
        let orders = OrderService::new(ports.prices, ports.orders.clone());
        Self {
            checkout: CheckoutService::new(orders.clone(), ports.gateway),
            orders,
            reconciler: CallbackReconciler::new(ports.orders, merchant_key, policy),
            users: UserService::new(ports.users),
            redirects,
        }
    }
}
