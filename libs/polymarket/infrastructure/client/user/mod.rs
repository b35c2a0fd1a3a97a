//! User channel state stores and reactive pipeline (C1-C7)
//!
//! Wire message types for the user WebSocket channel (`types`), the per-asset
//! state stores a quoting pass reads and writes (`order_book_store`,
//! `position_store`, `order_store`, `pending_tracker`, `market_config_store`,
//! `risk_state_store`), and the two components that keep them live:
//! `event_router` applies already-decoded market/user events optimistically,
//! `reconciliation` periodically reconciles them against the exchange's own
//! view.

mod types;

pub mod event_router;
pub mod market_config_store;
pub mod order_book_store;
pub mod order_store;
pub mod pending_tracker;
pub mod position_store;
pub mod reconciliation;
pub mod risk_state_store;

// Re-export types for WebSocket messages
pub use types::{
    AuthPayload, MakerOrder, OrderMessage, OrderType as WsOrderType, TradeMessage, TradeStatus,
    UserMessage, UserSubscription,
};

// Re-export the quoting-engine state stores (C1-C7).
pub use event_router::{EventRouter, EventRouterStores, MarketEvent, TradePassScheduler};
pub use market_config_store::{MarketConfigStore, SharedMarketConfigStore, TokenLocation};
pub use order_book_store::{BestQuote, OrderBookStore, SharedOrderBookStore};
pub use order_store::{ExchangeOrder, OrderStore, RestingOrder, SharedOrderStore, TokenOrders};
pub use pending_tracker::{pending_column, PendingTracker};
pub use position_store::{FillSide, Position, PositionStore, SharedPositionStore};
pub use reconciliation::{ExchangePosition, ReconcileSource, Reconciler, ReconcilerStores};
pub use risk_state_store::{RiskStateError, RiskStateStore};
