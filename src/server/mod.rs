pub mod routes;

use axum::routing::get;
use axum::Router;

pub fn router(facade: routes::SharedFacade) -> Router {
    Router::new()
        .route("/market-data", get(routes::show_market_data))
        .route("/market-data/save", get(routes::save_market_data))
        .route("/option-price", get(routes::option_price))
        .with_state(facade)
}
