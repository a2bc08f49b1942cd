//! The landing page.

use super::{AppRouter, Blueprint};
use axum::response::Html;
use axum::routing::get;

pub fn blueprint() -> Blueprint {
    Blueprint {
        name: "index",
        register,
        schema: &[],
    }
}

fn register(router: AppRouter) -> AppRouter {
    router.route("/", get(hello))
}

async fn hello() -> Html<&'static str> {
    Html("<p>Hello, World!</p>")
}
